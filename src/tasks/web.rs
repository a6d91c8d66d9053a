//! DVWA web host tasks: backup, restore, and user administration.
//!
//! Step order and operator-facing messages follow the runbook the scripts
//! were written against; the orchestration itself (session binding,
//! fail-fast steps, verification) is the pipeline's.

use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use log::info;

use crate::artifact::{ArtifactKind, BackupArtifact};
use crate::cloud;
use crate::config::{EnvSource, WebHostConfig, required};
use crate::db;
use crate::error::OpsError;
use crate::identity::NewUser;
use crate::pipeline::Pipeline;
use crate::remote::RemoteCommand;
use crate::runner::{ActionRunner, RemoteAction};
use crate::session::Session;

/// Remote directory where backup artifacts are created before download.
const REMOTE_BACKUP_DIR: &str = "/root";

/// Remote directory restore uploads land in before being applied.
const REMOTE_RESTORE_DIR: &str = "/tmp";

/// Configuration for `web backup`.
#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub host: WebHostConfig,
    pub local_dir: PathBuf,
    pub gdrive_folder: String,
}

impl BackupConfig {
    pub fn from_env(env: &impl EnvSource) -> crate::error::Result<Self> {
        Ok(Self {
            host: WebHostConfig::from_env(env)?,
            local_dir: PathBuf::from(required(env, "LOCAL_BACKUP_DIR")?),
            gdrive_folder: required(env, "GDRIVE_FOLDER_ID")?,
        })
    }
}

/// Configuration for `web restore`.
#[derive(Debug, Clone)]
pub struct RestoreConfig {
    pub host: WebHostConfig,
    pub local_dir: PathBuf,
    pub source_file_id: String,
    pub db_file_id: String,
}

impl RestoreConfig {
    pub fn from_env(env: &impl EnvSource) -> crate::error::Result<Self> {
        Ok(Self {
            host: WebHostConfig::from_env(env)?,
            local_dir: PathBuf::from(required(env, "LOCAL_BACKUP_DIR")?),
            source_file_id: required(env, "GDRIVE_SOURCE_FILE_ID")?,
            db_file_id: required(env, "GDRIVE_DB_FILE_ID")?,
        })
    }
}

fn bind_session(host: &WebHostConfig) -> crate::error::Result<Session> {
    Session::resolve(
        &host.host,
        host.ssh_port,
        &host.user,
        host.ssh_key.as_deref(),
        host.password.as_deref(),
    )
}

/// Archive the source tree and dump the database on the host, download both
/// artifacts, then upload both to the cloud folder.
pub fn backup(cfg: &BackupConfig) -> anyhow::Result<()> {
    fs::create_dir_all(&cfg.local_dir).map_err(OpsError::Io)?;

    let source = BackupArtifact::new(ArtifactKind::WebSource);
    let dump = BackupArtifact::new(ArtifactKind::WebDatabase);
    let remote_source = source.remote_path(REMOTE_BACKUP_DIR);
    let remote_dump = dump.remote_path(REMOTE_BACKUP_DIR);
    let local_source = source.local_path(&cfg.local_dir);
    let local_dump = dump.local_path(&cfg.local_dir);

    println!("Backing up DVWA from {}...", cfg.host.host);

    let mut pipeline = Pipeline::new("web backup");
    let runner =
        pipeline.authenticate(|| Ok(ActionRunner::new(bind_session(&cfg.host)?)))?;

    pipeline.step("create source archive on remote host", || {
        println!("Creating source code backup on remote server...");
        let tar = RemoteCommand::new("tar")
            .arg("-czf")
            .arg(remote_source.as_str())
            .arg("-C")
            .arg(cfg.host.web_path.as_str())
            .arg("dvwa");
        runner.run(&RemoteAction::mutating(tar))?;
        Ok(())
    })?;

    pipeline.step("create database dump on remote host", || {
        println!("Creating database backup on remote server...");
        runner.run(&RemoteAction::mutating(db::dump(
            &cfg.host.db,
            remote_dump.as_str(),
        )))?;
        Ok(())
    })?;

    pipeline.step("download source archive", || {
        println!("Downloading source backup to {}...", local_source.display());
        runner.run(&RemoteAction::download(remote_source.as_str(), &local_source))?;
        println!("Source backup downloaded to {}", local_source.display());
        Ok(())
    })?;

    pipeline.step("download database dump", || {
        println!("Downloading database backup to {}...", local_dump.display());
        runner.run(&RemoteAction::download(remote_dump.as_str(), &local_dump))?;
        println!("Database backup downloaded to {}", local_dump.display());
        Ok(())
    })?;

    pipeline.step("upload source archive to cloud folder", || {
        println!(
            "Uploading source backup to Google Drive folder {}...",
            cfg.gdrive_folder
        );
        runner.run(&cloud::upload_action(&local_source, &cfg.gdrive_folder))?;
        println!("Source backup uploaded to Google Drive successfully.");
        Ok(())
    })?;

    pipeline.step("upload database dump to cloud folder", || {
        println!(
            "Uploading database backup to Google Drive folder {}...",
            cfg.gdrive_folder
        );
        runner.run(&cloud::upload_action(&local_dump, &cfg.gdrive_folder))?;
        println!("Database backup uploaded to Google Drive successfully.");
        Ok(())
    })?;

    pipeline.finish()?;
    println!("\n✅ Backup completed successfully!");
    Ok(())
}

/// Pull both backups from the cloud, push them to the host, extract the
/// source tree, replay the dump, then best-effort remove the temp copies.
pub fn restore(cfg: &RestoreConfig) -> anyhow::Result<()> {
    fs::create_dir_all(&cfg.local_dir).map_err(OpsError::Io)?;

    println!("Restoring DVWA to {}...", cfg.host.host);

    let mut pipeline = Pipeline::new("web restore");
    let runner =
        pipeline.authenticate(|| Ok(ActionRunner::new(bind_session(&cfg.host)?)))?;

    let local_source = pipeline.step("download source backup from cloud", || {
        println!(
            "Downloading source backup from Google Drive (ID: {})...",
            cfg.source_file_id
        );
        runner.run(&cloud::download_action(&cfg.source_file_id, &cfg.local_dir))?;
        let path = cloud::resolve_download(&cfg.local_dir, &cfg.source_file_id)?;
        println!("Source backup downloaded to {}", path.display());
        Ok(path)
    })?;

    let local_dump = pipeline.step("download database backup from cloud", || {
        println!(
            "Downloading database backup from Google Drive (ID: {})...",
            cfg.db_file_id
        );
        runner.run(&cloud::download_action(&cfg.db_file_id, &cfg.local_dir))?;
        let path = cloud::resolve_download(&cfg.local_dir, &cfg.db_file_id)?;
        println!("Database backup downloaded to {}", path.display());
        Ok(path)
    })?;

    let remote_source = format!("{REMOTE_RESTORE_DIR}/{}", file_name(&local_source)?);
    let remote_dump = format!("{REMOTE_RESTORE_DIR}/{}", file_name(&local_dump)?);

    pipeline.step("upload source backup to remote host", || {
        println!("Uploading source backup to remote server...");
        runner.run(&RemoteAction::upload(&local_source, remote_source.as_str()))?;
        println!("Source backup uploaded successfully.");
        Ok(())
    })?;

    pipeline.step("upload database backup to remote host", || {
        println!("Uploading database backup to remote server...");
        runner.run(&RemoteAction::upload(&local_dump, remote_dump.as_str()))?;
        println!("Database backup uploaded successfully.");
        Ok(())
    })?;

    pipeline.step("extract source tree", || {
        println!("Extracting source backup on remote server...");
        let tar = RemoteCommand::new("tar")
            .arg("-xzf")
            .arg(remote_source.as_str())
            .arg("-C")
            .arg(format!("{}/", cfg.host.web_path));
        runner.run(&RemoteAction::mutating(tar))?;
        println!("Source files restored successfully.");
        Ok(())
    })?;

    pipeline.step("replay database dump", || {
        println!("Restoring database on remote server...");
        runner.run(&RemoteAction::mutating(db::replay(
            &cfg.host.db,
            remote_dump.as_str(),
        )))?;
        println!("Database restored successfully.");
        Ok(())
    })?;

    pipeline.best_effort("remove remote temp files", || {
        println!("Cleaning up temporary files on remote server...");
        let rm = RemoteCommand::new("rm")
            .arg("-f")
            .arg(remote_source.as_str())
            .arg(remote_dump.as_str());
        runner.run(&RemoteAction::mutating(rm))?;
        Ok(())
    })?;

    pipeline.finish()?;
    println!("\n✅ Restore completed successfully!");
    println!("DVWA has been restored to {}", cfg.host.host);
    Ok(())
}

/// Print the users table exactly as the database reports it.
pub fn show_users(cfg: &WebHostConfig) -> anyhow::Result<()> {
    println!("Connecting to {} via SSH...", cfg.host);
    println!("Querying users from database '{}'...\n", cfg.db.name);

    let mut pipeline = Pipeline::new("web show-users");
    let runner = pipeline.authenticate(|| Ok(ActionRunner::new(bind_session(cfg)?)))?;

    let rows = pipeline.step("query users table", || {
        let out = runner.run(&RemoteAction::query(db::exec(
            &cfg.db,
            db::list_users_sql(),
        )))?;
        Ok(out.stdout)
    })?;
    print!("{rows}");

    pipeline.finish()?;
    println!("\nQuery completed successfully!");
    Ok(())
}

/// Insert a freshly generated random user and verify the row landed.
///
/// Deliberately not idempotent: every run mints a new identity.
pub fn add_user(cfg: &WebHostConfig) -> anyhow::Result<()> {
    let user = NewUser::random(&mut rand::thread_rng());

    println!("Connecting to {} via SSH...", cfg.host);
    println!("Adding new user to database '{}'...\n", cfg.db.name);

    let mut pipeline = Pipeline::new("web add-user");
    let runner = pipeline.authenticate(|| Ok(ActionRunner::new(bind_session(cfg)?)))?;

    let next_id = pipeline.step("allocate next user id", || {
        println!("Getting next available user ID...");
        let out = runner.run(&RemoteAction::query(db::query_bare(
            &cfg.db,
            db::next_user_id_sql(),
        )))?;
        let id: u64 = out.value().parse().map_err(|_| {
            OpsError::verification(format!(
                "user id query returned '{}', expected an integer",
                out.value()
            ))
        })?;
        println!("Next user ID: {id}");
        Ok(id)
    })?;

    pipeline.step("insert user row", || {
        println!("\nInserting new user...");
        println!("  Username: {}", user.username);
        println!("  Password: {}", user.password);
        println!("  Name: {} {}", user.first_name, user.last_name);
        println!("  Avatar: {}\n", user.avatar);
        runner.run(&RemoteAction::mutating(db::exec(
            &cfg.db,
            db::insert_user_sql(next_id, &user),
        )))?;
        Ok(())
    })?;

    pipeline.step("verify user row exists", || {
        println!("Verifying user was added successfully...");
        let out = runner.run(&RemoteAction::query(db::query_bare(
            &cfg.db,
            db::count_by_id_sql(next_id),
        )))?;
        if out.value() != "1" {
            return Err(OpsError::verification(format!(
                "expected 1 row for user_id {next_id}, found {}",
                out.value()
            ))
            .into());
        }
        Ok(())
    })?;

    pipeline.finish()?;
    info!("added user '{}' with id {next_id}", user.username);
    println!("\n✅ User added successfully!");
    println!("\n📝 Login credentials:");
    println!("   Username: {}", user.username);
    println!("   Password: {}", user.password);
    Ok(())
}

/// Delete a user after showing the row and getting an explicit `yes`.
///
/// `input` carries the confirmation line; production passes stdin.
pub fn delete_user(
    cfg: &WebHostConfig,
    username: &str,
    input: &mut impl BufRead,
) -> anyhow::Result<()> {
    println!("Connecting to {} via SSH...", cfg.host);
    println!(
        "Searching for user '{username}' in database '{}'...\n",
        cfg.db.name
    );

    let mut pipeline = Pipeline::new("web delete-user");
    let runner = pipeline.authenticate(|| Ok(ActionRunner::new(bind_session(cfg)?)))?;

    pipeline.step("check user exists", || {
        let out = runner.run(&RemoteAction::query(db::query_bare(
            &cfg.db,
            db::count_by_username_sql(username),
        )))?;
        if out.value() == "0" {
            return Err(OpsError::verification(format!(
                "user '{username}' not found in database"
            ))
            .into());
        }
        Ok(())
    })?;

    let row = pipeline.step("fetch user row", || {
        let out = runner.run(&RemoteAction::query(db::exec(
            &cfg.db,
            db::user_row_sql(username),
        )))?;
        Ok(out.stdout)
    })?;
    println!("User found:");
    print!("{row}");

    println!("\n⚠️  Are you sure you want to delete user '{username}'?");
    pipeline.confirm("Type 'yes' to confirm: ", input)?;

    pipeline.step("delete user row", || {
        println!("\nDeleting user '{username}'...");
        runner.run(&RemoteAction::mutating(db::exec(
            &cfg.db,
            db::delete_user_sql(username),
        )))?;
        Ok(())
    })?;

    pipeline.step("verify user row removed", || {
        println!("Verifying deletion...");
        let out = runner.run(&RemoteAction::query(db::query_bare(
            &cfg.db,
            db::count_by_username_sql(username),
        )))?;
        if out.value() != "0" {
            return Err(OpsError::verification(format!(
                "user '{username}' still has {} row(s) after deletion",
                out.value()
            ))
            .into());
        }
        Ok(())
    })?;

    pipeline.finish()?;
    println!("\n✅ User '{username}' deleted successfully!");
    Ok(())
}

fn file_name(path: &Path) -> crate::error::Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            OpsError::transfer(format!(
                "downloaded file {} has no usable name",
                path.display()
            ))
        })
}
