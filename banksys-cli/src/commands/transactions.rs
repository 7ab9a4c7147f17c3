//! Transaction commands - list, pay, PIX, seed and analytics

use anyhow::{anyhow, Result};
use colored::Colorize;
use rust_decimal::Decimal;

use banksys_core::{
    NewTransaction, PixPayment, Transaction, TransactionCategory, TransactionType,
};

use super::get_authenticated_client;
use crate::output;

fn parse_amount(raw: &str) -> Result<Decimal> {
    // Accept both 89.50 and 89,50
    let normalized = raw.trim().replace(',', ".");
    normalized
        .parse::<Decimal>()
        .map_err(|_| anyhow!("Invalid amount: {}", raw))
}

fn signed_amount(tx: &Transaction) -> String {
    let formatted = output::format_money(tx.amount);
    if tx.transaction_type.is_inflow() {
        format!("+{}", formatted).green().to_string()
    } else {
        format!("-{}", formatted).normal().to_string()
    }
}

fn print_transactions(transactions: &[Transaction]) {
    if transactions.is_empty() {
        println!("No transactions. Run 'bks seed' to create sample data.");
        return;
    }

    let mut table = output::create_table();
    table.set_header(vec!["Date", "Description", "Counterparty", "Category", "Amount", "Status"]);
    for tx in transactions {
        table.add_row(vec![
            output::format_datetime(&tx.transaction_date),
            tx.description.clone(),
            tx.counterparty().unwrap_or("").to_string(),
            tx.category.to_string(),
            signed_amount(tx),
            tx.status.clone(),
        ]);
    }
    println!("{}", table);
}

pub async fn list(limit: u32, offset: u32, json: bool) -> Result<()> {
    let client = get_authenticated_client("transactions").await?;

    let pb = output::spinner("Loading transactions...", json);
    let result = client.refresh_transactions(limit, offset).await;
    pb.finish_and_clear();
    result?;

    let state = client.state();
    let transactions = state
        .snapshot()
        .and_then(|s| s.transactions.value.as_ref())
        .ok_or_else(|| anyhow!("Transactions are not available"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(transactions)?);
    } else {
        print_transactions(transactions);
    }
    Ok(())
}

pub struct PayArgs {
    pub transaction_type: String,
    pub amount: String,
    pub description: String,
    pub category: Option<String>,
    pub merchant: Option<String>,
    pub recipient: Option<String>,
}

pub async fn pay(args: PayArgs, json: bool) -> Result<()> {
    let mut draft = NewTransaction::new(
        TransactionType::parse(&args.transaction_type)?,
        parse_amount(&args.amount)?,
        args.description,
    );
    if let Some(category) = args.category {
        draft = draft.with_category(TransactionCategory::parse(&category)?);
    }
    if let Some(merchant) = args.merchant {
        draft = draft.with_merchant(merchant);
    }
    if let Some(recipient) = args.recipient {
        draft = draft.with_recipient(recipient);
    }
    draft.validate()?;

    let client = get_authenticated_client("pay").await?;
    let pb = output::spinner("Submitting transaction...", json);
    let result = client.create_transaction(&draft).await;
    pb.finish_and_clear();
    let created = result?;

    report_created(&client, &created, json)
}

pub async fn pix(
    key: String,
    amount: String,
    description: String,
    recipient: String,
    json: bool,
) -> Result<()> {
    let payment = PixPayment {
        pix_key: key,
        amount: parse_amount(&amount)?,
        description,
        recipient_name: recipient,
    };
    payment.validate()?;

    let client = get_authenticated_client("pix").await?;
    let pb = output::spinner("Sending PIX...", json);
    let result = client.send_pix(&payment).await;
    pb.finish_and_clear();
    let created = result?;

    report_created(&client, &created, json)
}

fn report_created(
    client: &banksys_core::BankingClient,
    created: &Transaction,
    json: bool,
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(created)?);
        return Ok(());
    }

    output::success(&format!(
        "{} {} ({})",
        "Done:".bold(),
        created.description,
        output::format_money(created.amount)
    ));

    let state = client.state();
    if let Some(snapshot) = state.snapshot() {
        if let Some(balance) = &snapshot.balance.value {
            println!("New balance: {}", output::format_money(balance.balance).bold());
        }
        for (slice, message) in snapshot.errors() {
            output::warning(&format!("Could not refresh {}: {}", slice, message));
        }
    }
    Ok(())
}

pub async fn seed(json: bool) -> Result<()> {
    let client = get_authenticated_client("seed").await?;
    let pb = output::spinner("Creating sample data...", json);
    let result = client.seed_sample_data().await;
    pb.finish_and_clear();
    let message = result?;

    if json {
        println!("{}", serde_json::json!({ "message": message }));
    } else {
        output::success(&message);
    }
    Ok(())
}

pub async fn analytics(months: u32, json: bool) -> Result<()> {
    let client = get_authenticated_client("analytics").await?;
    let pb = output::spinner("Crunching numbers...", json);
    let result = client.analytics(months).await;
    pb.finish_and_clear();
    let analytics = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analytics)?);
        return Ok(());
    }

    println!("{}", format!("Spending, last {} months", months).bold());
    println!();
    println!("  Income:   {}", output::format_money(analytics.total_income).green());
    println!("  Expenses: {}", output::format_money(analytics.total_expenses).red());

    if !analytics.category_breakdown.is_empty() {
        println!();
        let mut table = output::create_table();
        table.set_header(vec!["Category", "Amount"]);
        for c in &analytics.category_breakdown {
            table.add_row(vec![c.category.clone(), output::format_money(c.amount)]);
        }
        println!("{}", table);
    }

    if !analytics.top_merchants.is_empty() {
        println!();
        println!("{}", "Top merchants".bold());
        for m in &analytics.top_merchants {
            println!("  • {}: {}", m.merchant, output::format_money(m.amount));
        }
    }
    Ok(())
}
