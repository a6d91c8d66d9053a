//! Operation pipeline: the fail-fast state machine behind every task.
//!
//! A task is an ordered sequence of steps run against one session. The
//! pipeline owns the current state and enforces the only legal walk:
//!
//! ```text
//! Idle
//!     ↓
//! Authenticating
//!     ↓
//! Step(1) → Step(2) → … → Step(N)
//!     ↓
//! Completed
//!
//! (Any step can transition to Failed(i); the confirmation gate can
//!  transition to Aborted. Completed, Failed and Aborted are terminal.)
//! ```
//!
//! The first failing step wins: the pipeline records where it failed,
//! annotates the error with the step name, and refuses to run anything
//! further. The one exception is [`Pipeline::best_effort`], whose failure is
//! logged and swallowed, used for the remote temp-file cleanup after a
//! restore, where a leftover file is not worth failing a completed restore
//! over.

use std::fmt;
use std::io::{BufRead, Write};

use anyhow::Context;
use log::{error, info, warn};

use crate::error::{OpsError, Result};

/// Where a pipeline currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Constructed, nothing run yet.
    Idle,
    /// Resolving credentials and binding the session.
    Authenticating,
    /// Executing step `i` (1-based).
    Step(usize),
    /// All steps succeeded (terminal).
    Completed,
    /// Step `i` failed; 0 means authentication itself failed (terminal).
    Failed(usize),
    /// Operator declined the confirmation prompt (terminal, not a failure).
    Aborted,
}

impl PipelineState {
    /// Returns true if no further transitions are allowed
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_) | Self::Aborted)
    }

    /// Returns true while steps may still run
    #[inline]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Authenticating | Self::Step(_))
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Authenticating => write!(f, "authenticating"),
            Self::Step(i) => write!(f, "step {i}"),
            Self::Completed => write!(f, "completed"),
            Self::Failed(i) => write!(f, "failed at step {i}"),
            Self::Aborted => write!(f, "aborted by operator"),
        }
    }
}

/// Fail-fast executor for one user-facing task.
pub struct Pipeline {
    task: String,
    state: PipelineState,
    step_names: Vec<String>,
}

impl Pipeline {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            state: PipelineState::Idle,
            step_names: Vec::new(),
        }
    }

    #[inline]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// The step index the pipeline failed at, if it failed. 0 means the
    /// authentication stage.
    pub fn failed_at(&self) -> Option<usize> {
        match self.state {
            PipelineState::Failed(i) => Some(i),
            _ => None,
        }
    }

    /// Names of the steps that have been entered so far, in order.
    pub fn steps_run(&self) -> &[String] {
        &self.step_names
    }

    /// Resolve credentials / bind the session. Must be the first transition.
    pub fn authenticate<T>(
        &mut self,
        f: impl FnOnce() -> anyhow::Result<T>,
    ) -> anyhow::Result<T> {
        if self.state != PipelineState::Idle {
            return Err(OpsError::state(format!(
                "cannot authenticate from state '{}'",
                self.state
            ))
            .into());
        }
        self.state = PipelineState::Authenticating;
        info!("[{}] authenticating", self.task);
        match f() {
            Ok(v) => Ok(v),
            Err(e) => {
                self.state = PipelineState::Failed(0);
                error!("[{}] authentication failed", self.task);
                Err(e.context("authentication failed"))
            }
        }
    }

    /// Run the next step. Any error is terminal: the pipeline transitions to
    /// `Failed` at this step and the error comes back annotated with the
    /// step's position and name.
    pub fn step<T>(
        &mut self,
        name: &str,
        f: impl FnOnce() -> anyhow::Result<T>,
    ) -> anyhow::Result<T> {
        let index = self.enter_step(name)?;
        match f() {
            Ok(v) => Ok(v),
            Err(e) => {
                self.state = PipelineState::Failed(index);
                error!("[{}] step {} ({}) failed", self.task, index, name);
                Err(e).with_context(|| format!("step {index} ({name}) failed"))
            }
        }
    }

    /// Run a step whose failure must not change the terminal outcome. The
    /// failure is logged at warn level and otherwise dropped.
    // TODO: decide whether a failed cleanup should also be echoed in the
    // task's final summary line; ops has not picked a convention yet.
    pub fn best_effort(
        &mut self,
        name: &str,
        f: impl FnOnce() -> anyhow::Result<()>,
    ) -> anyhow::Result<()> {
        let index = self.enter_step(name)?;
        if let Err(e) = f() {
            warn!(
                "[{}] best-effort step {} ({}) failed: {:#}",
                self.task, index, name, e
            );
        }
        Ok(())
    }

    /// Interactive confirmation gate for destructive steps. Only the literal
    /// `yes` (case-insensitive, trimmed) proceeds; anything else (including
    /// end of input) is an operator abort, which is terminal but reported
    /// as a deliberate decision, not a failure.
    pub fn confirm(&mut self, prompt: &str, input: &mut impl BufRead) -> anyhow::Result<()> {
        if !self.state.is_active() {
            return Err(OpsError::state(format!(
                "cannot prompt for confirmation from state '{}'",
                self.state
            ))
            .into());
        }

        print!("{prompt}");
        std::io::stdout().flush().map_err(OpsError::Io)?;

        let mut line = String::new();
        let answer = match input.read_line(&mut line) {
            Ok(0) => "",
            Ok(_) => line.as_str(),
            Err(e) => return Err(OpsError::Io(e).into()),
        };

        if is_affirmative(answer) {
            info!("[{}] destructive step confirmed", self.task);
            Ok(())
        } else {
            self.state = PipelineState::Aborted;
            info!("[{}] aborted by operator", self.task);
            Err(OpsError::UserAbort.into())
        }
    }

    /// Mark the pipeline completed.
    pub fn finish(&mut self) -> Result<()> {
        if !self.state.is_active() {
            return Err(OpsError::state(format!(
                "cannot complete from state '{}'",
                self.state
            )));
        }
        self.state = PipelineState::Completed;
        info!(
            "[{}] completed ({} steps)",
            self.task,
            self.step_names.len()
        );
        Ok(())
    }

    fn enter_step(&mut self, name: &str) -> Result<usize> {
        let index = match self.state {
            PipelineState::Authenticating => 1,
            PipelineState::Step(i) => i + 1,
            _ => {
                return Err(OpsError::state(format!(
                    "cannot run step '{}' from state '{}'",
                    name, self.state
                )));
            }
        };
        self.state = PipelineState::Step(index);
        self.step_names.push(name.to_string());
        info!("[{}] step {}: {}", self.task, index, name);
        Ok(index)
    }
}

/// The confirmation predicate: literal `yes`, any case, surrounding
/// whitespace ignored.
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn authed(task: &str) -> Pipeline {
        let mut p = Pipeline::new(task);
        p.authenticate(|| Ok(())).unwrap();
        p
    }

    #[test]
    fn test_happy_path_walk() {
        let mut p = Pipeline::new("backup");
        assert_eq!(p.state(), PipelineState::Idle);

        p.authenticate(|| Ok(())).unwrap();
        assert_eq!(p.state(), PipelineState::Authenticating);

        p.step("first", || Ok(())).unwrap();
        assert_eq!(p.state(), PipelineState::Step(1));

        p.step("second", || Ok(())).unwrap();
        assert_eq!(p.state(), PipelineState::Step(2));

        p.finish().unwrap();
        assert_eq!(p.state(), PipelineState::Completed);
        assert!(p.state().is_terminal());
        assert_eq!(p.steps_run(), ["first", "second"]);
    }

    #[test]
    fn test_step_failure_is_terminal_and_named() {
        let mut p = authed("restore");
        p.step("download", || Ok(())).unwrap();
        let err = p
            .step("extract", || -> anyhow::Result<()> {
                Err(anyhow::anyhow!("tar exited 2"))
            })
            .unwrap_err();
        assert_eq!(p.state(), PipelineState::Failed(2));
        assert_eq!(p.failed_at(), Some(2));
        let msg = format!("{err:#}");
        assert!(msg.contains("step 2 (extract) failed"), "got: {msg}");

        // Nothing may run after failure.
        let err = p.step("next", || Ok(())).unwrap_err();
        assert!(err.downcast_ref::<OpsError>().is_some_and(|e| matches!(
            e,
            OpsError::State(_)
        )));
    }

    #[test]
    fn test_authentication_failure_is_failed_at_zero() {
        let mut p = Pipeline::new("backup");
        let err = p
            .authenticate(|| -> anyhow::Result<()> {
                Err(OpsError::auth_selection("no credentials").into())
            })
            .unwrap_err();
        assert_eq!(p.failed_at(), Some(0));
        assert!(format!("{err:#}").contains("authentication failed"));
    }

    #[test]
    fn test_steps_require_authentication_first() {
        let mut p = Pipeline::new("backup");
        assert!(p.step("too early", || Ok(())).is_err());
        assert_eq!(p.state(), PipelineState::Idle);
    }

    #[test]
    fn test_cannot_authenticate_twice() {
        let mut p = authed("backup");
        assert!(p.authenticate(|| Ok(())).is_err());
    }

    #[test]
    fn test_best_effort_failure_does_not_change_outcome() {
        let mut p = authed("restore");
        p.step("restore db", || Ok(())).unwrap();
        p.best_effort("cleanup", || Err(anyhow::anyhow!("rm exited 1")))
            .unwrap();
        assert_eq!(p.state(), PipelineState::Step(2));
        p.finish().unwrap();
        assert_eq!(p.state(), PipelineState::Completed);
    }

    #[test]
    fn test_confirm_accepts_only_literal_yes() {
        for accepted in ["yes", "Yes", "YES", "  yes\n"] {
            let mut p = authed("delete-user");
            p.confirm("sure? ", &mut Cursor::new(accepted)).unwrap();
            assert!(p.state().is_active());
        }

        for declined in ["no", "", "y", "yess", "nope\n"] {
            let mut p = authed("delete-user");
            let err = p
                .confirm("sure? ", &mut Cursor::new(declined))
                .unwrap_err();
            assert!(err
                .downcast_ref::<OpsError>()
                .is_some_and(|e| matches!(e, OpsError::UserAbort)));
            assert_eq!(p.state(), PipelineState::Aborted);
        }
    }

    #[test]
    fn test_no_steps_after_abort() {
        let mut p = authed("delete-user");
        let _ = p.confirm("sure? ", &mut Cursor::new("no"));
        assert!(p.step("delete", || Ok(())).is_err());
        assert!(p.finish().is_err());
    }

    #[test]
    fn test_finish_requires_active_state() {
        let mut p = Pipeline::new("backup");
        assert!(p.finish().is_err());

        let mut p = authed("backup");
        let _ = p.step("boom", || -> anyhow::Result<()> { Err(anyhow::anyhow!("x")) });
        assert!(p.finish().is_err());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(PipelineState::Idle.to_string(), "idle");
        assert_eq!(PipelineState::Step(3).to_string(), "step 3");
        assert_eq!(PipelineState::Failed(2).to_string(), "failed at step 2");
        assert_eq!(PipelineState::Aborted.to_string(), "aborted by operator");
    }

    #[test]
    fn test_is_affirmative() {
        assert!(is_affirmative("yes"));
        assert!(is_affirmative("YES"));
        assert!(is_affirmative(" Yes \n"));
        assert!(!is_affirmative("y"));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("no"));
    }
}
