//! pfSense firewall tasks: config backup and restore.
//!
//! The appliance exposes its whole configuration as one XML file, so both
//! tasks are short transfer pipelines. Restore stages the file under `/tmp`
//! and only then moves it over `/cf/conf/config.xml` and reboots, all in one
//! chained remote action so a failed upload never half-applies.

use std::fs;
use std::path::PathBuf;

use crate::artifact::{ArtifactKind, BackupArtifact};
use crate::cloud;
use crate::config::{EnvSource, FirewallConfig, required};
use crate::error::OpsError;
use crate::pipeline::Pipeline;
use crate::remote::{RemoteCommand, RemoteScript};
use crate::runner::{ActionRunner, RemoteAction};
use crate::session::Session;

/// Where the staged config lands before being moved into place.
const REMOTE_STAGING_PATH: &str = "/tmp/restore_config.xml";

/// The live appliance configuration file.
const ACTIVE_CONFIG_PATH: &str = "/cf/conf/config.xml";

/// Configuration for `firewall backup`.
#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub fw: FirewallConfig,
    pub local_dir: PathBuf,
    pub gdrive_folder: String,
}

impl BackupConfig {
    pub fn from_env(env: &impl EnvSource) -> crate::error::Result<Self> {
        Ok(Self {
            fw: FirewallConfig::from_env(env)?,
            local_dir: PathBuf::from(required(env, "LOCAL_BACKUP_DIR")?),
            gdrive_folder: required(env, "GDRIVE_FOLDER_ID")?,
        })
    }
}

/// Configuration for `firewall restore`.
#[derive(Debug, Clone)]
pub struct RestoreConfig {
    pub fw: FirewallConfig,
    pub local_dir: PathBuf,
    pub file_id: String,
}

impl RestoreConfig {
    pub fn from_env(env: &impl EnvSource) -> crate::error::Result<Self> {
        Ok(Self {
            fw: FirewallConfig::from_env(env)?,
            local_dir: PathBuf::from(required(env, "LOCAL_BACKUP_DIR")?),
            file_id: required(env, "GDRIVE_FILE_ID")?,
        })
    }
}

fn bind_session(fw: &FirewallConfig) -> crate::error::Result<Session> {
    // The appliance only takes password logins on the standard port.
    Session::resolve(&fw.host, 22, &fw.user, None, Some(&fw.password))
}

/// Copy the appliance config off-box and upload it to the cloud folder.
pub fn backup(cfg: &BackupConfig) -> anyhow::Result<()> {
    fs::create_dir_all(&cfg.local_dir).map_err(OpsError::Io)?;

    let artifact = BackupArtifact::new(ArtifactKind::FirewallConfig);
    let local_path = artifact.local_path(&cfg.local_dir);

    println!("Backing up pfSense config from {}...", cfg.fw.host);

    let mut pipeline = Pipeline::new("firewall backup");
    let runner = pipeline.authenticate(|| Ok(ActionRunner::new(bind_session(&cfg.fw)?)))?;

    pipeline.step("download appliance config", || {
        runner.run(&RemoteAction::download(
            cfg.fw.backup_path.as_str(),
            &local_path,
        ))?;
        println!("Backup downloaded to {}", local_path.display());
        Ok(())
    })?;

    pipeline.step("upload config to cloud folder", || {
        println!(
            "Uploading backup to Google Drive folder {}...",
            cfg.gdrive_folder
        );
        runner.run(&cloud::upload_action(&local_path, &cfg.gdrive_folder))?;
        println!("Backup uploaded to Google Drive successfully.");
        Ok(())
    })?;

    pipeline.finish()?;
    println!("\n✅ Backup completed successfully!");
    Ok(())
}

/// Fetch a config from the cloud, stage it on the appliance, move it into
/// place and reboot.
pub fn restore(cfg: &RestoreConfig) -> anyhow::Result<()> {
    fs::create_dir_all(&cfg.local_dir).map_err(OpsError::Io)?;

    let mut pipeline = Pipeline::new("firewall restore");
    let runner = pipeline.authenticate(|| Ok(ActionRunner::new(bind_session(&cfg.fw)?)))?;

    let local_path = pipeline.step("download config from cloud", || {
        println!(
            "Downloading backup file from Google Drive (ID: {})...",
            cfg.file_id
        );
        runner.run(&cloud::download_action(&cfg.file_id, &cfg.local_dir))?;
        let path = cloud::resolve_download(&cfg.local_dir, &cfg.file_id)?;
        println!("Backup file downloaded to {}", path.display());
        Ok(path)
    })?;

    pipeline.step("upload config to appliance", || {
        println!("Uploading backup file to pfSense server {}...", cfg.fw.host);
        runner.run(&RemoteAction::upload(&local_path, REMOTE_STAGING_PATH))?;
        println!("Backup file uploaded to pfSense server successfully.");
        Ok(())
    })?;

    pipeline.step("activate config and reboot", || {
        println!("Restoring config and rebooting pfSense server (overwrite {ACTIVE_CONFIG_PATH})...");
        let activate = RemoteScript::all([
            RemoteCommand::new("mv")
                .arg(REMOTE_STAGING_PATH)
                .arg(ACTIVE_CONFIG_PATH),
            RemoteCommand::new("reboot"),
        ]);
        runner.run(&RemoteAction::mutating(activate))?;
        println!("Config restored and pfSense is rebooting.");
        Ok(())
    })?;

    pipeline.finish()?;
    println!("\n✅ Restore completed successfully!");
    Ok(())
}
