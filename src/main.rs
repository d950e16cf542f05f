use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use rusqlite::backup::Progress;
use tracing_subscriber::EnvFilter;

use shelfkeeper::admin::{self, LoadOptions};
use shelfkeeper::filter::{Column, FilterSet};
use shelfkeeper::persist::{Account, Persistor, open_existing};
use shelfkeeper::settings::{Settings, expand_path};
use shelfkeeper::{Result, ShelfkeeperError};

/// Backup, delete and load Calibre-Web accounts
#[derive(Parser, Debug)]
#[command(name = "shelfkeeper", version, about)]
struct Cli {
    /// The SQLite3 database for the Calibre-Web application (default from settings)
    #[arg(long, global = true)]
    db: Option<String>,

    /// Settings file to use instead of ./shelfkeeper.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Repack the database and back it up with the online backup API
    Backup {
        /// The database to back up (defaults to --db)
        source: Option<String>,
        /// The destination to back up to (defaults to <name>-backup.<ext>)
        destination: Option<String>,
        /// The number of pages to copy in each step
        #[arg(long)]
        pages: Option<i32>,
    },
    /// Delete accounts matching every combination of the given patterns.
    ///
    /// Patterns use '%' and '_' to match any run of characters or a single
    /// character. For example, to delete alice and bob in both the example.com
    /// and aol.com domains:
    ///
    ///   shelfkeeper delete --nickname alice bob --email %@example.com %@aol.com
    Delete {
        /// Show accounts that would be deleted
        #[arg(short = 'n', long)]
        dry_run: bool,
        /// Patterns to match in the nickname of the account
        #[arg(long, num_args = 1..)]
        nickname: Vec<String>,
        /// Patterns to match in the email of the account
        #[arg(long, num_args = 1..)]
        email: Vec<String>,
    },
    /// Load accounts from a TSV/CSV file
    Load {
        /// Input file with nickname, and optionally email and password (default: stdin)
        infile: Option<PathBuf>,
        /// Show the number of accounts that would be created
        #[arg(short = 'n', long)]
        dry_run: bool,
        /// Display the SQL statements executed
        #[arg(long)]
        debug: bool,
        /// The nickname of the account to base the new accounts on
        #[arg(long)]
        template_nickname: Option<String>,
        /// The domain for nicknames that come without an email
        #[arg(long)]
        domain: Option<String>,
        /// The password for accounts that come without one
        #[arg(long)]
        password: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => usage_error(&e),
    };
    let debug = matches!(cli.command, Command::Load { debug: true, .. });
    init_tracing(if debug { "debug" } else { settings.log_level.as_str() });

    match run(cli, &settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_usage() => usage_error(&e),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn usage_error(e: &ShelfkeeperError) -> ! {
    Cli::command().error(ErrorKind::ValueValidation, e).exit()
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli, settings: &Settings) -> Result<()> {
    let database = match &cli.db {
        Some(db) => expand_path(db),
        None => settings.database_path(),
    };
    match cli.command {
        Command::Backup { source, destination, pages } => {
            let source = source.as_deref().map(expand_path).unwrap_or(database);
            let destination = destination.as_deref().map(expand_path);
            let report = admin::backup_database(
                &source,
                destination.as_deref(),
                pages.unwrap_or(settings.backup_pages),
                Some(progress),
            )?;
            println!("Repacked source {}", report.source.display());
            println!("\nBacked up to {}", report.destination.display());
        }
        Command::Delete { dry_run, nickname, email } => {
            let filters = FilterSet::new()
                .with(Column::Nickname, nickname)
                .with(Column::Email, email);
            filters.validate()?;
            let connection = open_existing(&database)?;
            let report = admin::delete_accounts(&Persistor::new(&connection), &filters, dry_run)?;
            if dry_run {
                print_accounts(&report.matched);
            } else {
                println!("Deleted {} accounts", report.deleted);
                if let Some(sequence) = report.sequence {
                    println!("Reset ID sequence to {sequence}");
                }
                if report.repacked {
                    println!("Repacked {}", database.display());
                }
            }
        }
        Command::Load {
            infile,
            dry_run,
            debug,
            template_nickname,
            domain,
            password,
        } => {
            let options = LoadOptions {
                template_nickname: template_nickname
                    .unwrap_or_else(|| settings.template_nickname.clone()),
                default_domain: domain,
                default_password: password,
                dry_run,
                progress: (!debug).then_some(loading_dot as fn(usize)),
            };
            let connection = open_existing(&database)?;
            let persistor = Persistor::new(&connection);
            let hasher = settings.hasher();
            if !debug {
                eprint!("Loading");
            }
            let report = match infile {
                Some(path) => {
                    admin::load_accounts(&persistor, File::open(path)?, &options, hasher)?
                }
                None => admin::load_accounts(&persistor, io::stdin().lock(), &options, hasher)?,
            };
            if !debug {
                eprintln!();
            }
            if report.dry_run {
                println!("Would have loaded {} accounts", report.loaded);
            } else {
                println!("Loaded {} accounts", report.loaded);
            }
        }
    }
    Ok(())
}

fn print_accounts(accounts: &[Account]) {
    let rows: Vec<[&str; 2]> = accounts
        .iter()
        .map(|a| {
            [
                a.nickname.as_deref().unwrap_or(""),
                a.email.as_deref().unwrap_or(""),
            ]
        })
        .collect();
    let nickname_width = rows.iter().map(|r| r[0].len()).max().unwrap_or(0);
    for [nickname, email] in rows {
        println!("{nickname:nickname_width$} {email}");
    }
    println!("{} accounts would be deleted", accounts.len());
}

fn loading_dot(_processed: usize) {
    eprint!(".");
    let _ = io::stderr().flush();
}

fn progress(p: Progress) {
    const BAR_LEN: i32 = 60;
    let total = p.pagecount.max(1);
    let count = total - p.remaining;
    let filled =
        (((BAR_LEN * count) as f64 / total as f64).round() as usize).min(BAR_LEN as usize);
    let pct = (1000.0 * count as f64 / total as f64).round() / 10.0;
    let bar = "=".repeat(filled) + &"-".repeat(BAR_LEN as usize - filled);
    eprint!("[{bar}] {pct}%\r");
    let _ = io::stderr().flush();
}
