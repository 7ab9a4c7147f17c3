//! Logs command - inspect the session and sync event log

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use banksys_core::services::{now_ms, EntryPoint, LogEntry, LogFilter, LoggingService};
use banksys_core::Slice;

use super::get_banksys_dir;
use crate::output;

/// Longest retention window `logs clear` accepts
const MAX_RETENTION_DAYS: u32 = 3650;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent events
    List {
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Only this event (login_failed, refresh_failed, session_expired, ...)
        #[arg(long)]
        event: Option<String>,
        /// Only events about this slice (balance, credit_cards, transactions)
        #[arg(long, value_parser = parse_slice)]
        slice: Option<Slice>,
        /// Only events that carry an error
        #[arg(long)]
        failures: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete old events
    Clear {
        /// Keep the last N days
        #[arg(
            long,
            default_value = "30",
            value_parser = clap::value_parser!(u32).range(0..=MAX_RETENTION_DAYS as i64)
        )]
        older_than_days: u32,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Failure breakdown per event and slice
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_slice(raw: &str) -> Result<Slice, String> {
    Slice::ALL
        .into_iter()
        .find(|s| s.as_str() == raw)
        .ok_or_else(|| format!("unknown slice '{}' (balance, credit_cards, transactions)", raw))
}

fn open_log() -> Result<LoggingService> {
    LoggingService::new(&get_banksys_dir(), EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
}

fn format_timestamp(timestamp_ms: i64) -> String {
    use chrono::{Local, TimeZone};
    Local
        .timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%d/%m/%Y %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

/// Unix ms before which `logs clear` deletes
fn retention_cutoff(now_ms: i64, days: u32) -> i64 {
    now_ms.saturating_sub(i64::from(days) * DAY_MS)
}

fn print_entries(entries: &[LogEntry]) {
    let mut table = output::create_table();
    table.set_header(vec!["Time", "Event", "Slice", "Command", "Failure"]);
    for entry in entries {
        let event = if entry.is_failure() {
            entry.event.red().to_string()
        } else {
            entry.event.clone()
        };
        let failure = match (&entry.error_details, &entry.error_message) {
            (Some(kind), Some(message)) => format!("[{}] {}", kind, message),
            (None, Some(message)) => message.clone(),
            _ => String::new(),
        };
        table.add_row(vec![
            format_timestamp(entry.timestamp),
            event,
            entry.slice.clone().unwrap_or_default(),
            entry.command.clone().unwrap_or_default(),
            failure,
        ]);
    }
    println!("{}", table);
}

pub fn run(command: LogsCommands) -> Result<()> {
    let log = open_log()?;

    match command {
        LogsCommands::List { limit, event, slice, failures, json } => {
            let filter = LogFilter {
                event,
                slice: slice.map(|s| s.as_str().to_string()),
                failures_only: failures,
                limit,
            };
            let entries = log.query(&filter)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("No events recorded.");
            } else {
                print_entries(&entries);
            }
        }
        LogsCommands::Clear { older_than_days, force, json } => {
            if !force && !json {
                let confirmed = dialoguer::Confirm::new()
                    .with_prompt(format!("Delete events older than {} days?", older_than_days))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let deleted = log.delete_before(retention_cutoff(now_ms(), older_than_days))?;
            if json {
                println!("{}", serde_json::json!({ "deleted": deleted }));
            } else {
                output::success(&format!("Deleted {} events", deleted));
            }
        }
        LogsCommands::Stats { json } => {
            let total = log.count()?;
            let failures = log.failure_counts()?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "total_events": total,
                        "failures": failures,
                        "database_path": log.db_path(),
                    }))?
                );
                return Ok(());
            }

            println!("{} events in {}", total, log.db_path().display());
            if failures.is_empty() {
                output::success("No failures recorded.");
                return Ok(());
            }

            println!();
            let mut table = output::create_table();
            table.set_header(vec!["Event", "Slice", "Failures"]);
            for f in &failures {
                table.add_row(vec![
                    f.event.clone(),
                    f.slice.clone().unwrap_or_else(|| "-".to_string()),
                    f.count.to_string(),
                ]);
            }
            println!("{}", table);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct LogsCli {
        #[command(subcommand)]
        command: LogsCommands,
    }

    #[test]
    fn test_retention_cutoff() {
        assert_eq!(retention_cutoff(10 * DAY_MS, 3), 7 * DAY_MS);
        assert_eq!(retention_cutoff(0, 0), 0);
        // The widest window stays representable
        assert!(retention_cutoff(now_ms(), MAX_RETENTION_DAYS) < now_ms());
    }

    #[test]
    fn test_clear_rejects_out_of_range_retention() {
        let huge = LogsCli::try_parse_from(["logs", "clear", "--older-than-days", "99999999999"]);
        assert!(huge.is_err());

        let parsed = LogsCli::try_parse_from(["logs", "clear", "--older-than-days", "7", "-f"])
            .unwrap();
        assert!(matches!(
            parsed.command,
            LogsCommands::Clear { older_than_days: 7, force: true, .. }
        ));
    }

    #[test]
    fn test_list_slice_filter_parses_known_slices() {
        assert_eq!(parse_slice("credit_cards").unwrap(), Slice::CreditCards);
        assert!(parse_slice("investments").is_err());

        let parsed =
            LogsCli::try_parse_from(["logs", "list", "--slice", "balance", "--failures"]).unwrap();
        assert!(matches!(
            parsed.command,
            LogsCommands::List { slice: Some(Slice::Balance), failures: true, .. }
        ));
    }
}
