//! Balance and credit card commands

use anyhow::{anyhow, Result};
use colored::Colorize;

use super::get_authenticated_client;
use crate::output;

pub async fn balance(json: bool) -> Result<()> {
    let client = get_authenticated_client("balance").await?;

    // initialize() already loaded the snapshot; only retry a failed slice
    let state = client.state();
    let needs_refresh = state
        .snapshot()
        .map(|s| !s.balance.is_loaded())
        .unwrap_or(true);
    if needs_refresh {
        client.refresh_balance().await?;
    }

    let state = client.state();
    let balance = state
        .snapshot()
        .and_then(|s| s.balance.value.as_ref())
        .ok_or_else(|| anyhow!("Balance is not available"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(balance)?);
        return Ok(());
    }

    println!("{}", "Account Balance".bold());
    println!();
    println!("  Account:   {}", balance.account_number);
    println!("  Balance:   {}", output::format_money(balance.balance).bold());
    println!("  Available: {}", output::format_money(balance.available_balance));
    Ok(())
}

pub async fn cards(json: bool) -> Result<()> {
    let client = get_authenticated_client("cards").await?;

    let state = client.state();
    if !state.snapshot().map(|s| s.credit_cards.is_loaded()).unwrap_or(false) {
        client.refresh_credit_cards().await?;
    }

    let state = client.state();
    let cards = state
        .snapshot()
        .and_then(|s| s.credit_cards.value.as_ref())
        .ok_or_else(|| anyhow!("Credit cards are not available"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(cards)?);
        return Ok(());
    }

    if cards.is_empty() {
        println!("No credit cards.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Card", "Number", "Limit", "Available", "Current bill", "Due"]);
    for card in cards {
        table.add_row(vec![
            card.card_name.clone(),
            format!("•••• {}", card.last_four()),
            output::format_money(card.credit_limit),
            output::format_money(card.available_limit),
            output::format_money(card.current_balance),
            output::format_date(&card.due_date),
        ]);
    }
    println!("{}", table);
    Ok(())
}
