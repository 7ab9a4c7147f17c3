//! Status command - show session and cache status

use anyhow::Result;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use banksys_core::domain::user::mask_cpf;
use banksys_core::{Slice, SliceStatus};

use super::{get_banksys_dir, get_client};
use crate::output;

pub async fn run(json: bool) -> Result<()> {
    let client = get_client("status").await?;
    let state = client.state();
    let config = banksys_core::config::Config::load(&get_banksys_dir())?;

    if json {
        let slices: Vec<SliceStatus> = Slice::ALL
            .into_iter()
            .map(|slice| match state.snapshot() {
                Some(snapshot) => snapshot.slice_status(slice),
                None => SliceStatus::unknown(slice),
            })
            .collect();

        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "session": state.session(),
                "demo_mode": config.demo_mode,
                "api_url": config.api_base_url,
                "slices": slices,
            }))?
        );
        return Ok(());
    }

    println!("{}", "BankSys Status".bold());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let session = state.session();
    table.add_row(vec!["Session".to_string(), session.status().to_string()]);
    if let Some(user) = session.user() {
        table.add_row(vec!["User".to_string(), user.full_name.clone()]);
        table.add_row(vec!["CPF".to_string(), mask_cpf(&user.cpf)]);
    }
    let backend = if config.demo_mode {
        "demo".to_string()
    } else {
        config.api_base_url.clone()
    };
    table.add_row(vec!["Backend".to_string(), backend]);
    println!("{}", table);

    match state.snapshot() {
        Some(snapshot) => {
            println!();
            if let Some(balance) = &snapshot.balance.value {
                println!("Balance: {}", output::format_money(balance.balance).bold());
            }
            if let Some(cards) = &snapshot.credit_cards.value {
                println!("Credit cards: {}", cards.len());
            }
            if let Some(txs) = &snapshot.transactions.value {
                println!("Recent transactions: {}", txs.len());
            }
            for (slice, message) in snapshot.errors() {
                output::warning(&format!("Could not load {}: {}", slice, message));
            }
        }
        None => {
            println!();
            output::info("Run 'bks login' to sign in.");
        }
    }

    Ok(())
}
