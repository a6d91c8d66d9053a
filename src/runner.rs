//! Action execution.
//!
//! This module is the only place that spawns child processes for remote
//! work. Every action funnels through [`ActionRunner::run`], which wraps the
//! invocation for the session's authentication mode, waits for the child,
//! and classifies the outcome: exit code zero is success, anything else is a
//! terminal failure for that action. Retries and recovery are deliberately
//! absent; the pipeline decides what a failure means.

use std::path::PathBuf;
use std::process::Command;

use log::{debug, info};

use crate::error::{OpsError, Result};
use crate::remote::RemoteScript;
use crate::session::{AuthMethod, Session};

/// What an action does, which decides how its outcome is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Read-only; captured stdout is returned for inspection.
    Query,
    /// Changes remote state; output streams through to the operator.
    Mutating,
    /// Moves bytes between machines; output streams through.
    Transfer,
}

/// Where and how an action executes.
#[derive(Debug, Clone)]
pub enum Target {
    /// Run a command on the remote host over ssh.
    Remote(RemoteScript),
    /// Copy a local file to a remote path over scp.
    Upload { local: PathBuf, remote: String },
    /// Copy a remote file to a local path over scp.
    Download { remote: String, local: PathBuf },
    /// Run a local process (the cloud CLI); never wrapped with ssh auth.
    Local { program: String, args: Vec<String> },
}

/// One unit of work, fully rendered before it reaches the runner.
#[derive(Debug, Clone)]
pub struct RemoteAction {
    pub kind: ActionKind,
    pub target: Target,
}

impl RemoteAction {
    pub fn query(script: impl Into<RemoteScript>) -> Self {
        Self {
            kind: ActionKind::Query,
            target: Target::Remote(script.into()),
        }
    }

    pub fn mutating(script: impl Into<RemoteScript>) -> Self {
        Self {
            kind: ActionKind::Mutating,
            target: Target::Remote(script.into()),
        }
    }

    pub fn upload(local: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::Transfer,
            target: Target::Upload {
                local: local.into(),
                remote: remote.into(),
            },
        }
    }

    pub fn download(remote: impl Into<String>, local: impl Into<PathBuf>) -> Self {
        Self {
            kind: ActionKind::Transfer,
            target: Target::Download {
                remote: remote.into(),
                local: local.into(),
            },
        }
    }

    pub fn local_transfer<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: ActionKind::Transfer,
            target: Target::Local {
                program: program.into(),
                args: args.into_iter().map(Into::into).collect(),
            },
        }
    }
}

/// Result of a successful action. `stdout` is empty unless the action was a
/// query.
#[derive(Debug, Clone)]
pub struct ActionOutput {
    pub stdout: String,
}

impl ActionOutput {
    /// Captured stdout with surrounding whitespace stripped, for the bare
    /// `-sN` style values queries produce.
    pub fn value(&self) -> &str {
        self.stdout.trim()
    }
}

/// Executes actions against one resolved [`Session`].
pub struct ActionRunner {
    session: Session,
}

impl ActionRunner {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Build the full local argv for a target, including the sshpass wrapper
    /// or key-file flag the session calls for. Local targets pass through
    /// untouched.
    pub fn invocation(&self, target: &Target) -> Vec<String> {
        match target {
            Target::Remote(script) => {
                let mut argv = self.transport_argv("ssh", "-p");
                argv.push(self.session.destination());
                argv.push(script.rendered());
                argv
            }
            Target::Upload { local, remote } => {
                let mut argv = self.transport_argv("scp", "-P");
                argv.push(local.display().to_string());
                argv.push(format!("{}:{}", self.session.destination(), remote));
                argv
            }
            Target::Download { remote, local } => {
                let mut argv = self.transport_argv("scp", "-P");
                argv.push(format!("{}:{}", self.session.destination(), remote));
                argv.push(local.display().to_string());
                argv
            }
            Target::Local { program, args } => {
                let mut argv = vec![program.clone()];
                argv.extend(args.iter().cloned());
                argv
            }
        }
    }

    /// ssh/scp preamble: optional sshpass wrapper, host-key option, port
    /// (`-p` for ssh, `-P` for scp), key-file flag for key sessions.
    fn transport_argv(&self, transport: &str, port_flag: &str) -> Vec<String> {
        let mut argv = Vec::new();
        if let AuthMethod::Password(pw) = &self.session.auth {
            argv.extend(["sshpass".to_string(), "-p".to_string(), pw.clone()]);
        }
        argv.push(transport.to_string());
        argv.extend(["-o".to_string(), "StrictHostKeyChecking=no".to_string()]);
        argv.extend([port_flag.to_string(), self.session.port.to_string()]);
        if let AuthMethod::KeyFile(key) = &self.session.auth {
            argv.extend(["-i".to_string(), key.display().to_string()]);
        }
        argv
    }

    /// Run one action to completion and classify the outcome.
    pub fn run(&self, action: &RemoteAction) -> Result<ActionOutput> {
        let argv = self.invocation(&action.target);
        debug!("spawning: {}", redact(&argv).join(" "));

        let (program, args) = argv
            .split_first()
            .expect("invocation always has a program");
        let mut cmd = Command::new(program);
        cmd.args(args);

        if action.kind == ActionKind::Query {
            // Queries are captured so callers can inspect the value.
            let output = cmd
                .output()
                .map_err(|e| self.failure(action, format!("failed to spawn {program}: {e}")))?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                let code = output.status.code().unwrap_or(-1);
                let detail = if stderr.is_empty() {
                    format!("{program} exited with code {code}")
                } else {
                    format!("{program} exited with code {code}: {stderr}")
                };
                return Err(self.failure(action, detail));
            }
            info!("{program} succeeded");
            Ok(ActionOutput {
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            })
        } else {
            // Mutating and transfer actions stream their output straight to
            // the operator, the way the underlying tools present it.
            let status = cmd
                .status()
                .map_err(|e| self.failure(action, format!("failed to spawn {program}: {e}")))?;
            if !status.success() {
                let code = status.code().unwrap_or(-1);
                return Err(self.failure(action, format!("{program} exited with code {code}")));
            }
            info!("{program} succeeded");
            Ok(ActionOutput {
                stdout: String::new(),
            })
        }
    }

    fn failure(&self, action: &RemoteAction, detail: String) -> OpsError {
        match action.kind {
            ActionKind::Transfer => OpsError::transfer(detail),
            _ => OpsError::remote_action(detail),
        }
    }
}

/// Invocation argv with the sshpass password masked, safe for logs.
pub fn redact(argv: &[String]) -> Vec<String> {
    let mut out = argv.to_vec();
    if out.first().map(String::as_str) == Some("sshpass") && out.len() > 2 {
        out[2] = "****".to_string();
    }
    out
}
