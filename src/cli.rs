use clap::{Parser, Subcommand};

/// labops - operator tasks for the lab appliances
#[derive(Parser)]
#[command(name = "labops")]
#[command(about = "Backup, restore and user administration for the lab appliances")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// DVWA web host tasks
    Web {
        #[command(subcommand)]
        task: WebCommands,
    },
    /// pfSense firewall tasks
    Firewall {
        #[command(subcommand)]
        task: FirewallCommands,
    },
}

#[derive(Subcommand)]
pub enum WebCommands {
    /// Archive the source tree and dump the database, store both locally and in the cloud
    Backup,
    /// Fetch both backups from the cloud and replay them onto the host
    Restore,
    /// Print the users table
    ShowUsers,
    /// Insert a randomly generated user and verify it landed
    AddUser,
    /// Delete a user (shows the row, then asks for confirmation)
    DeleteUser {
        /// Username to delete (e.g. john123)
        username: String,
    },
}

#[derive(Subcommand)]
pub enum FirewallCommands {
    /// Copy the appliance config off-box and into the cloud
    Backup,
    /// Push a config from the cloud onto the appliance and reboot it
    Restore,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
