//! Environment-sourced configuration.
//!
//! Every task builds its full configuration up front, before any child
//! process is spawned, so a missing option fails fast and names itself.
//! The resulting structs are immutable and passed by reference into the
//! pipeline; nothing reads the environment mid-run.

use crate::error::{OpsError, Result};

/// Source of configuration values. Production uses the process environment;
/// tests inject a map.
pub trait EnvSource {
    fn get(&self, name: &str) -> Option<String>;
}

/// Reads from the process environment. Empty values count as unset, matching
/// how the deployment `.env` files leave optional entries blank.
pub struct SystemEnv;

impl EnvSource for SystemEnv {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.trim().is_empty())
    }
}

impl EnvSource for std::collections::HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        std::collections::HashMap::get(self, name)
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }
}

/// Fetch a required option, naming it on failure.
pub fn required(env: &impl EnvSource, name: &str) -> Result<String> {
    env.get(name).ok_or_else(|| OpsError::missing_var(name))
}

/// Fetch an optional option.
pub fn optional(env: &impl EnvSource, name: &str) -> Option<String> {
    env.get(name)
}

/// Fetch an option, falling back to a default when unset.
pub fn with_default(env: &impl EnvSource, name: &str, default: &str) -> String {
    env.get(name).unwrap_or_else(|| default.to_string())
}

/// MySQL credentials and database name on the web host.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub name: String,
    pub user: String,
    pub password: String,
}

/// Connection options for the DVWA web host.
///
/// `password` and `ssh_key` are both optional here; which one actually
/// authenticates is decided once by [`crate::session::Session::resolve`].
#[derive(Debug, Clone)]
pub struct WebHostConfig {
    pub host: String,
    pub user: String,
    pub ssh_port: u16,
    pub password: Option<String>,
    pub ssh_key: Option<String>,
    pub web_path: String,
    pub db: DbConfig,
}

impl WebHostConfig {
    pub fn from_env(env: &impl EnvSource) -> Result<Self> {
        let host = required(env, "DVWA_HOST")?;
        let user = required(env, "DVWA_USER")?;
        let db_password = required(env, "DVWA_DB_PASSWORD")?;

        let port_raw = with_default(env, "DVWA_SSH_PORT", "2222");
        let ssh_port = port_raw
            .parse::<u16>()
            .map_err(|_| OpsError::config(format!("invalid DVWA_SSH_PORT: {port_raw}")))?;

        Ok(Self {
            host,
            user,
            ssh_port,
            password: optional(env, "DVWA_PASSWORD"),
            ssh_key: optional(env, "DVWA_SSH_KEY"),
            web_path: with_default(env, "DVWA_WEB_PATH", "/var/www/html"),
            db: DbConfig {
                name: with_default(env, "DVWA_DB_NAME", "dvwa"),
                user: with_default(env, "DVWA_DB_USER", "root"),
                password: db_password,
            },
        })
    }
}

/// Connection options for the pfSense firewall appliance.
///
/// The appliance only supports password logins, so the password is required
/// up front rather than resolved against a key file.
#[derive(Debug, Clone)]
pub struct FirewallConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub backup_path: String,
}

impl FirewallConfig {
    pub fn from_env(env: &impl EnvSource) -> Result<Self> {
        Ok(Self {
            host: required(env, "PFSENSE_HOST")?,
            user: required(env, "PFSENSE_USER")?,
            password: required(env, "PFSENSE_PASSWORD")?,
            backup_path: required(env, "PFSENSE_BACKUP_PATH")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn minimal_web_env() -> HashMap<String, String> {
        env(&[
            ("DVWA_HOST", "10.0.0.5"),
            ("DVWA_USER", "root"),
            ("DVWA_DB_PASSWORD", "dbpw"),
        ])
    }

    #[test]
    fn test_missing_required_var_is_named() {
        let mut e = minimal_web_env();
        e.remove("DVWA_HOST");
        let err = WebHostConfig::from_env(&e).unwrap_err();
        assert!(err.to_string().contains("DVWA_HOST"), "got: {err}");
    }

    #[test]
    fn test_empty_value_counts_as_unset() {
        let mut e = minimal_web_env();
        e.insert("DVWA_USER".into(), "  ".into());
        let err = WebHostConfig::from_env(&e).unwrap_err();
        assert!(err.to_string().contains("DVWA_USER"));
    }

    #[test]
    fn test_web_defaults() {
        let cfg = WebHostConfig::from_env(&minimal_web_env()).unwrap();
        assert_eq!(cfg.ssh_port, 2222);
        assert_eq!(cfg.web_path, "/var/www/html");
        assert_eq!(cfg.db.name, "dvwa");
        assert_eq!(cfg.db.user, "root");
        assert!(cfg.password.is_none());
        assert!(cfg.ssh_key.is_none());
    }

    #[test]
    fn test_web_overrides() {
        let mut e = minimal_web_env();
        e.insert("DVWA_SSH_PORT".into(), "22".into());
        e.insert("DVWA_DB_NAME".into(), "dvwa_test".into());
        e.insert("DVWA_PASSWORD".into(), "hunter2".into());
        let cfg = WebHostConfig::from_env(&e).unwrap();
        assert_eq!(cfg.ssh_port, 22);
        assert_eq!(cfg.db.name, "dvwa_test");
        assert_eq!(cfg.password.as_deref(), Some("hunter2"));
    }

    #[test]
    fn test_invalid_port_is_config_error() {
        let mut e = minimal_web_env();
        e.insert("DVWA_SSH_PORT".into(), "not-a-port".into());
        let err = WebHostConfig::from_env(&e).unwrap_err();
        assert!(matches!(err, OpsError::Config(_)));
        assert!(err.to_string().contains("DVWA_SSH_PORT"));
    }

    #[test]
    fn test_firewall_requires_everything() {
        for missing in [
            "PFSENSE_HOST",
            "PFSENSE_USER",
            "PFSENSE_PASSWORD",
            "PFSENSE_BACKUP_PATH",
        ] {
            let mut e = env(&[
                ("PFSENSE_HOST", "192.168.1.1"),
                ("PFSENSE_USER", "admin"),
                ("PFSENSE_PASSWORD", "pfpw"),
                ("PFSENSE_BACKUP_PATH", "/cf/conf/config.xml"),
            ]);
            e.remove(missing);
            let err = FirewallConfig::from_env(&e).unwrap_err();
            assert!(err.to_string().contains(missing), "missing {missing}: {err}");
        }
    }
}
