//! BankSys CLI - digital banking in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{account, auth, demo, logs, status, transactions};

/// BankSys - digital banking in your terminal
#[derive(Parser)]
#[command(name = "bks", version, about, long_about = None)]
struct Cli {
    /// Print diagnostic output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with CPF and password
    Login {
        /// CPF (11 digits, formatted or not)
        #[arg(long)]
        cpf: Option<String>,
        /// Password (falls back to BANKSYS_PASSWORD, then a prompt)
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign out and forget the saved session
    Logout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a new account
    Register {
        #[arg(long)]
        cpf: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show session and cache status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the account balance
    Balance {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List credit cards
    Cards {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List recent transactions
    Transactions {
        /// Page size (1-100)
        #[arg(short, long, default_value = "20")]
        limit: u32,
        /// Number of transactions to skip
        #[arg(long, default_value = "0")]
        offset: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record a payment, transfer or deposit
    Pay {
        /// Transaction type (pix, transfer, payment, deposit, ...)
        #[arg(long = "type", default_value = "payment")]
        transaction_type: String,
        /// Amount, e.g. 89.50
        #[arg(long)]
        amount: String,
        /// Description shown on the statement
        #[arg(long)]
        description: String,
        /// Category (food, transport, shopping, ...)
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        merchant: Option<String>,
        #[arg(long)]
        recipient: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Send a PIX payment
    Pix {
        /// PIX key (CPF, email, phone or random key)
        #[arg(long)]
        key: String,
        /// Amount, e.g. 150.00
        #[arg(long)]
        amount: String,
        /// Recipient name
        #[arg(long)]
        recipient: String,
        #[arg(long, default_value = "PIX")]
        description: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Ask the backend to create sample transactions
    Seed {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Spending analytics
    Analytics {
        /// Months to look back (1-12)
        #[arg(long, default_value = "6")]
        months: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage demo mode
    Demo {
        #[command(subcommand)]
        command: Option<demo::DemoCommands>,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "banksys_core=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Login { cpf, password, json } => auth::login(cpf, password, json).await,
        Commands::Logout { json } => auth::logout(json).await,
        Commands::Register { cpf, name, email, phone, password, json } => {
            auth::register(cpf, name, email, phone, password, json).await
        }
        Commands::Status { json } => status::run(json).await,
        Commands::Balance { json } => account::balance(json).await,
        Commands::Cards { json } => account::cards(json).await,
        Commands::Transactions { limit, offset, json } => {
            transactions::list(limit, offset, json).await
        }
        Commands::Pay {
            transaction_type,
            amount,
            description,
            category,
            merchant,
            recipient,
            json,
        } => {
            let args = transactions::PayArgs {
                transaction_type,
                amount,
                description,
                category,
                merchant,
                recipient,
            };
            transactions::pay(args, json).await
        }
        Commands::Pix { key, amount, recipient, description, json } => {
            transactions::pix(key, amount, description, recipient, json).await
        }
        Commands::Seed { json } => transactions::seed(json).await,
        Commands::Analytics { months, json } => transactions::analytics(months, json).await,
        Commands::Demo { command } => demo::run(command),
        Commands::Logs { command } => logs::run(command),
    }
}
