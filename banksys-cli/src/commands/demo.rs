//! Demo command - manage demo mode

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use banksys_core::adapters::demo::{DEMO_CPF, DEMO_PASSWORD};
use banksys_core::config::Config;

use banksys_core::services::LogEvent;

use super::{get_banksys_dir, get_logger, log_event};
use crate::output;

#[derive(Subcommand)]
pub enum DemoCommands {
    /// Enable demo mode
    #[command(name = "on")]
    On,
    /// Disable demo mode
    #[command(name = "off")]
    Off,
    /// Show demo mode status
    Status,
}

pub fn run(command: Option<DemoCommands>) -> Result<()> {
    let banksys_dir = get_banksys_dir();
    std::fs::create_dir_all(&banksys_dir)?;
    let mut config = Config::load(&banksys_dir)?;
    let logger = get_logger();

    match command {
        Some(DemoCommands::On) => {
            config.enable_demo_mode();
            config.save(&banksys_dir)?;
            log_event(logger.as_ref(), LogEvent::new("command_executed").with_command("demo on"));
            println!("{}", "Demo mode enabled".green());
            output::info(&format!("Log in with CPF {} and password {}.", DEMO_CPF, DEMO_PASSWORD));
        }
        Some(DemoCommands::Off) => {
            config.disable_demo_mode();
            config.save(&banksys_dir)?;
            log_event(logger.as_ref(), LogEvent::new("command_executed").with_command("demo off"));
            println!("{}", "Demo mode disabled".yellow());
        }
        Some(DemoCommands::Status) | None => {
            if config.demo_mode {
                println!("Demo mode is {}", "ON".green());
            } else {
                println!("Demo mode is {}", "OFF".yellow());
            }
        }
    }
    Ok(())
}
