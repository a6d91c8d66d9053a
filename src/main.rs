//! labops - Main entry point
//!
//! One subcommand per operator task. Exit codes: 0 for a completed task or
//! an operator-declined confirmation, 1 for any configuration,
//! authentication, remote-action or transfer failure.

use log::{debug, info};

use labops::cli::{Cli, Commands, FirewallCommands, WebCommands};
use labops::config::{SystemEnv, WebHostConfig};
use labops::error::OpsError;
use labops::tasks::{firewall, web};

/// Initialize the logger with appropriate settings
fn init_logger() {
    use env_logger::Builder;
    use std::io::Write;

    Builder::from_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}:{}] {}",
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env() // Allows RUST_LOG env var to override
        .init();
}

fn main() {
    init_logger();
    info!("labops starting up");

    let cli = Cli::parse_args();
    debug!("CLI arguments parsed");

    if let Err(e) = run(cli) {
        // A declined confirmation is a deliberate operator decision, not a
        // failure: distinct message, clean exit.
        if matches!(e.downcast_ref::<OpsError>(), Some(OpsError::UserAbort)) {
            println!("Deletion cancelled.");
            return;
        }
        eprintln!("✗ {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let env = SystemEnv;
    match cli.command {
        Commands::Web { task } => match task {
            WebCommands::Backup => {
                let cfg = web::BackupConfig::from_env(&env)?;
                web::backup(&cfg)
            }
            WebCommands::Restore => {
                let cfg = web::RestoreConfig::from_env(&env)?;
                web::restore(&cfg)
            }
            WebCommands::ShowUsers => {
                let cfg = WebHostConfig::from_env(&env)?;
                web::show_users(&cfg)
            }
            WebCommands::AddUser => {
                let cfg = WebHostConfig::from_env(&env)?;
                web::add_user(&cfg)
            }
            WebCommands::DeleteUser { username } => {
                let cfg = WebHostConfig::from_env(&env)?;
                let stdin = std::io::stdin();
                web::delete_user(&cfg, &username, &mut stdin.lock())
            }
        },
        Commands::Firewall { task } => match task {
            FirewallCommands::Backup => {
                let cfg = firewall::BackupConfig::from_env(&env)?;
                firewall::backup(&cfg)
            }
            FirewallCommands::Restore => {
                let cfg = firewall::RestoreConfig::from_env(&env)?;
                firewall::restore(&cfg)
            }
        },
    }
}
