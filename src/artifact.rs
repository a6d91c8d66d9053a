//! Backup artifact naming.
//!
//! Artifact names are derived from the local clock at a fixed granularity
//! per artifact kind, so listings sort chronologically. Two backups of the
//! same kind inside one granularity window produce the same name and the
//! later one overwrites the earlier, a documented property of the naming
//! scheme, not something this module tries to prevent.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};

/// The kinds of point-in-time exports the tasks produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Tarball of the DVWA source tree. Date granularity.
    WebSource,
    /// mysqldump of the DVWA database. Date granularity.
    WebDatabase,
    /// pfSense config.xml export. Second granularity.
    FirewallConfig,
}

impl ArtifactKind {
    /// File name for an artifact created at `when`.
    pub fn file_name_at<Tz: TimeZone>(self, when: DateTime<Tz>) -> String
    where
        Tz::Offset: fmt::Display,
    {
        match self {
            Self::WebSource => format!("dvwa_source_backup_{}.tar.gz", when.format("%Y-%m-%d")),
            Self::WebDatabase => format!("dvwa_db_backup_{}.sql", when.format("%Y-%m-%d")),
            Self::FirewallConfig => format!("pfsense_backup_{}.xml", when.format("%Y%m%d_%H%M%S")),
        }
    }
}

/// A named point-in-time export. Created remotely or fetched from the
/// appliance, transferred to the local backup directory, optionally uploaded
/// to cloud storage; never mutated after creation.
#[derive(Debug, Clone)]
pub struct BackupArtifact {
    pub kind: ArtifactKind,
    pub file_name: String,
}

impl BackupArtifact {
    /// Name an artifact after the current local time.
    pub fn new(kind: ArtifactKind) -> Self {
        Self::at(kind, Local::now())
    }

    /// Name an artifact after an explicit timestamp (test seam).
    pub fn at<Tz: TimeZone>(kind: ArtifactKind, when: DateTime<Tz>) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        Self {
            kind,
            file_name: kind.file_name_at(when),
        }
    }

    /// Where the artifact lands in the local backup directory.
    pub fn local_path(&self, backup_dir: &Path) -> PathBuf {
        backup_dir.join(&self.file_name)
    }

    /// Where the artifact lives under a remote directory prefix.
    pub fn remote_path(&self, remote_dir: &str) -> String {
        format!("{}/{}", remote_dir.trim_end_matches('/'), self.file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_web_names_use_date_granularity() {
        let t = at(2026, 8, 7, 14, 30, 59);
        assert_eq!(
            ArtifactKind::WebSource.file_name_at(t),
            "dvwa_source_backup_2026-08-07.tar.gz"
        );
        assert_eq!(
            ArtifactKind::WebDatabase.file_name_at(t),
            "dvwa_db_backup_2026-08-07.sql"
        );
    }

    #[test]
    fn test_firewall_name_uses_second_granularity() {
        let t = at(2026, 8, 7, 14, 30, 59);
        assert_eq!(
            ArtifactKind::FirewallConfig.file_name_at(t),
            "pfsense_backup_20260807_143059.xml"
        );
    }

    #[test]
    fn test_same_window_collides_by_design() {
        // Two runs on the same day share a name; the later backup overwrites.
        let morning = at(2026, 8, 7, 9, 0, 0);
        let evening = at(2026, 8, 7, 21, 12, 5);
        assert_eq!(
            ArtifactKind::WebSource.file_name_at(morning),
            ArtifactKind::WebSource.file_name_at(evening)
        );

        // At second granularity the same instant collides, a second apart
        // does not.
        assert_eq!(
            ArtifactKind::FirewallConfig.file_name_at(morning),
            ArtifactKind::FirewallConfig.file_name_at(morning)
        );
        assert_ne!(
            ArtifactKind::FirewallConfig.file_name_at(morning),
            ArtifactKind::FirewallConfig.file_name_at(at(2026, 8, 7, 9, 0, 1))
        );
    }

    #[test]
    fn test_paths() {
        let artifact = BackupArtifact::at(ArtifactKind::WebDatabase, at(2026, 8, 7, 0, 0, 0));
        assert_eq!(
            artifact.local_path(Path::new("/backups")),
            PathBuf::from("/backups/dvwa_db_backup_2026-08-07.sql")
        );
        assert_eq!(
            artifact.remote_path("/root/"),
            "/root/dvwa_db_backup_2026-08-07.sql"
        );
        assert_eq!(
            artifact.remote_path("/root"),
            "/root/dvwa_db_backup_2026-08-07.sql"
        );
    }
}
