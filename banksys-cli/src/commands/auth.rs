//! Login, logout and register commands

use anyhow::Result;
use colored::Colorize;
use dialoguer::{Input, Password};

use banksys_core::domain::user::mask_cpf;
use banksys_core::RegisterRequest;

use super::get_client;
use crate::output;

/// Get the password from the flag, BANKSYS_PASSWORD, or a prompt
fn password_or_prompt(flag: Option<String>, prompt: &str) -> Result<String> {
    if let Some(p) = flag {
        return Ok(p);
    }
    if let Ok(p) = std::env::var("BANKSYS_PASSWORD") {
        return Ok(p);
    }
    Ok(Password::new().with_prompt(prompt).interact()?)
}

fn input_or_prompt(flag: Option<String>, prompt: &str) -> Result<String> {
    match flag {
        Some(v) => Ok(v),
        None => Ok(Input::<String>::new().with_prompt(prompt).interact_text()?),
    }
}

pub async fn login(cpf: Option<String>, password: Option<String>, json: bool) -> Result<()> {
    let client = get_client("login").await?;
    let cpf = input_or_prompt(cpf, "CPF")?;
    let password = password_or_prompt(password, "Password")?;

    let pb = output::spinner("Signing in...", json);
    let result = client.login(&cpf, &password).await;
    pb.finish_and_clear();
    let session = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&session)?);
        return Ok(());
    }

    if let Some(user) = session.user() {
        output::success(&format!("Welcome back, {}!", user.first_name()));
    }
    let state = client.state();
    if let Some(snapshot) = state.snapshot() {
        for (slice, message) in snapshot.errors() {
            output::warning(&format!("Could not load {}: {}", slice, message));
        }
    }
    Ok(())
}

pub async fn logout(json: bool) -> Result<()> {
    let client = get_client("logout").await?;
    let was_logged_in = client.session().is_authenticated();
    client.logout();

    if json {
        println!("{}", serde_json::json!({"logged_out": was_logged_in}));
    } else if was_logged_in {
        println!("{}", "Logged out".yellow());
    } else {
        println!("Not logged in.");
    }
    Ok(())
}

pub async fn register(
    cpf: Option<String>,
    full_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let client = get_client("register").await?;

    let cpf = input_or_prompt(cpf, "CPF")?;
    let full_name = input_or_prompt(full_name, "Full name")?;
    let email = input_or_prompt(email, "Email")?;
    let phone = input_or_prompt(phone, "Phone")?;
    let password = match password {
        Some(p) => p,
        None => {
            let p1 = Password::new().with_prompt("Password").interact()?;
            let p2 = Password::new().with_prompt("Confirm password").interact()?;
            if p1 != p2 {
                anyhow::bail!("Passwords do not match");
            }
            p1
        }
    };

    let request = RegisterRequest::new(&cpf, &password, &full_name, &email, &phone)?;
    let pb = output::spinner("Creating account...", json);
    let result = client.register(&request).await;
    pb.finish_and_clear();
    let user = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
    } else {
        output::success(&format!("Account created for {}", user.full_name));
        println!("CPF: {}", mask_cpf(&user.cpf));
        println!("Run 'bks login' to sign in.");
    }
    Ok(())
}
