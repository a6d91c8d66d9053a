//! Cloud storage edge: uploads and downloads through the `gdrive` CLI.
//!
//! The provider API stays opaque: both directions are plain local
//! processes classified as transfers. The one piece of logic owned here is
//! resolving what a download actually wrote: gdrive names the file after
//! the remote file's own name, which the caller does not know up front, so
//! the destination directory is scanned after the fact.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{OpsError, Result};
use crate::runner::RemoteAction;

/// Upload a local file into a cloud folder.
pub fn upload_action(local: &Path, folder_id: &str) -> RemoteAction {
    RemoteAction::local_transfer(
        "gdrive",
        [
            "files".to_string(),
            "upload".to_string(),
            "--parent".to_string(),
            folder_id.to_string(),
            local.display().to_string(),
        ],
    )
}

/// Download a cloud file by identifier into a local directory.
pub fn download_action(file_id: &str, dest_dir: &Path) -> RemoteAction {
    RemoteAction::local_transfer(
        "gdrive",
        [
            "files".to_string(),
            "download".to_string(),
            "--destination".to_string(),
            dest_dir.display().to_string(),
            "--overwrite".to_string(),
            file_id.to_string(),
        ],
    )
}

/// Resolve the file a reported-successful download produced.
///
/// Preference order: a file whose name contains the identifier, else the
/// most recently created file in the directory. An empty directory means
/// the download claimed success but delivered nothing.
pub fn resolve_download(dest_dir: &Path, file_id: &str) -> Result<PathBuf> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dest_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }

    if let Some(matched) = files.iter().find(|p| {
        p.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.contains(file_id))
    }) {
        return Ok(matched.clone());
    }

    files
        .into_iter()
        .max_by_key(|p| creation_time(p))
        .ok_or_else(|| {
            OpsError::transfer(format!(
                "download of '{}' reported success but {} is empty",
                file_id,
                dest_dir.display()
            ))
        })
}

fn creation_time(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|m| m.created().or_else(|_| m.modified()))
        .unwrap_or(SystemTime::UNIX_EPOCH)
}
