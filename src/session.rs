//! Credential resolution and the per-run session binding.
//!
//! Exactly one authentication mode is selected before any remote call is
//! attempted, and the resulting [`Session`] is reused for every ssh/scp
//! invocation in the run. A key file that exists wins; otherwise a password
//! requires the `sshpass` playback helper to be installed locally; otherwise
//! resolution fails before anything touches the network.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{OpsError, Result};

/// How a session authenticates to the remote host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    /// `ssh -i <path>` style key authentication.
    KeyFile(PathBuf),
    /// Password authentication played back through `sshpass -p`.
    Password(String),
}

/// Resolved authentication + host binding, immutable for the run.
#[derive(Debug, Clone)]
pub struct Session {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub auth: AuthMethod,
}

impl Session {
    /// Resolve the authentication mode for a host.
    ///
    /// Selection order matches the deployment contract: a key-file path that
    /// exists on the local filesystem selects key mode; else a password
    /// selects password mode (asserting `sshpass` is on PATH); else this is
    /// a configuration dead end.
    pub fn resolve(
        host: &str,
        port: u16,
        user: &str,
        key_path: Option<&str>,
        password: Option<&str>,
    ) -> Result<Self> {
        Self::resolve_with(
            host,
            port,
            user,
            key_path,
            password,
            |p| p.exists(),
            binary_exists,
        )
    }

    /// Resolution core with injectable probes, a pure function of
    /// (key-path-exists?, password-present?, helper-available?).
    pub fn resolve_with(
        host: &str,
        port: u16,
        user: &str,
        key_path: Option<&str>,
        password: Option<&str>,
        key_exists: impl Fn(&Path) -> bool,
        helper_available: impl Fn(&str) -> bool,
    ) -> Result<Self> {
        let auth = match key_path.map(expand_tilde) {
            Some(key) if key_exists(&key) => AuthMethod::KeyFile(key),
            _ => match password {
                Some(pw) => {
                    if !helper_available("sshpass") {
                        return Err(OpsError::auth_selection(
                            "sshpass is required for password authentication; \
                             install it (e.g. brew install hudochenkov/sshpass/sshpass)",
                        ));
                    }
                    AuthMethod::Password(pw.to_string())
                }
                None => {
                    return Err(OpsError::auth_selection(
                        "either an SSH key file or a password must be provided",
                    ));
                }
            },
        };

        Ok(Self {
            host: host.to_string(),
            port,
            user: user.to_string(),
            auth,
        })
    }

    /// `user@host`, as ssh and scp want it.
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    pub fn is_password(&self) -> bool {
        matches!(self.auth, AuthMethod::Password(_))
    }
}

/// Expand a leading `~/` against the local home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Check if a binary is available in PATH
pub fn binary_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(
        key: Option<&str>,
        key_on_disk: bool,
        password: Option<&str>,
        helper: bool,
    ) -> Result<Session> {
        Session::resolve_with(
            "10.0.0.5",
            2222,
            "root",
            key,
            password,
            move |_| key_on_disk,
            move |_| helper,
        )
    }

    // Exhaustive truth table over (key-exists?, password-present?,
    // helper-available?). The helper probe only matters on the password
    // branch, which the short-circuit cases pin down.

    #[test]
    fn test_key_present_wins_regardless_of_helper() {
        for helper in [true, false] {
            for password in [Some("pw"), None] {
                let s = resolve(Some("/keys/id_ed25519"), true, password, helper).unwrap();
                assert_eq!(
                    s.auth,
                    AuthMethod::KeyFile(PathBuf::from("/keys/id_ed25519"))
                );
            }
        }
    }

    #[test]
    fn test_missing_key_file_falls_back_to_password() {
        let s = resolve(Some("/keys/absent"), false, Some("pw"), true).unwrap();
        assert_eq!(s.auth, AuthMethod::Password("pw".into()));
    }

    #[test]
    fn test_password_without_helper_fails() {
        for key in [None, Some("/keys/absent")] {
            let err = resolve(key, false, Some("pw"), false).unwrap_err();
            assert!(matches!(err, OpsError::AuthSelection(_)));
            assert!(err.to_string().contains("sshpass"));
        }
    }

    #[test]
    fn test_password_with_helper_selects_password_mode() {
        let s = resolve(None, false, Some("pw"), true).unwrap();
        assert!(s.is_password());
    }

    #[test]
    fn test_neither_credential_fails() {
        for helper in [true, false] {
            let err = resolve(None, false, None, helper).unwrap_err();
            assert!(matches!(err, OpsError::AuthSelection(_)));
        }

        // Key path set but missing on disk, and no password either.
        let err = resolve(Some("/keys/absent"), false, None, true).unwrap_err();
        assert!(matches!(err, OpsError::AuthSelection(_)));
    }

    #[test]
    fn test_destination_format() {
        let s = resolve(None, false, Some("pw"), true).unwrap();
        assert_eq!(s.destination(), "root@10.0.0.5");
    }

    #[test]
    fn test_tilde_expansion() {
        let expanded = expand_tilde("~/keys/id_rsa");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expanded, home.join("keys/id_rsa"));
        }
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
    }

    #[test]
    fn test_binary_exists_finds_sh() {
        assert!(binary_exists("sh"), "sh should be available");
        assert!(!binary_exists("this_binary_definitely_does_not_exist_12345"));
    }
}
