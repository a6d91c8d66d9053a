//! Parameterized construction of remote command lines.
//!
//! ssh ultimately hands the remote side a single string, so the string is
//! assembled here from discrete arguments with every element single-quoted.
//! Callers never concatenate operator-influenced values (usernames,
//! passwords, paths) into shell text themselves.

use std::fmt;

/// One remote program invocation: program, arguments, and optional
/// redirection targets on the remote side.
#[derive(Debug, Clone)]
pub struct RemoteCommand {
    argv: Vec<String>,
    stdout_to: Option<String>,
    stdin_from: Option<String>,
}

impl RemoteCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            argv: vec![program.into()],
            stdout_to: None,
            stdin_from: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.argv.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argv.extend(args.into_iter().map(Into::into));
        self
    }

    /// Redirect the remote command's stdout into a remote file.
    pub fn stdout_to(mut self, remote_path: impl Into<String>) -> Self {
        self.stdout_to = Some(remote_path.into());
        self
    }

    /// Feed the remote command's stdin from a remote file.
    pub fn stdin_from(mut self, remote_path: impl Into<String>) -> Self {
        self.stdin_from = Some(remote_path.into());
        self
    }

    /// Render to shell text with every element quoted.
    pub fn rendered(&self) -> String {
        let mut out = self
            .argv
            .iter()
            .map(|a| sh_quote(a))
            .collect::<Vec<_>>()
            .join(" ");
        if let Some(path) = &self.stdout_to {
            out.push_str(" > ");
            out.push_str(&sh_quote(path));
        }
        if let Some(path) = &self.stdin_from {
            out.push_str(" < ");
            out.push_str(&sh_quote(path));
        }
        out
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered())
    }
}

/// A `&&` chain of remote commands, executed as one ssh call so later
/// commands only run when earlier ones succeed (e.g. "move the config into
/// place, then reboot").
#[derive(Debug, Clone)]
pub struct RemoteScript {
    commands: Vec<RemoteCommand>,
}

impl RemoteScript {
    pub fn single(command: RemoteCommand) -> Self {
        Self {
            commands: vec![command],
        }
    }

    pub fn all(commands: impl IntoIterator<Item = RemoteCommand>) -> Self {
        Self {
            commands: commands.into_iter().collect(),
        }
    }

    pub fn rendered(&self) -> String {
        self.commands
            .iter()
            .map(RemoteCommand::rendered)
            .collect::<Vec<_>>()
            .join(" && ")
    }
}

impl From<RemoteCommand> for RemoteScript {
    fn from(command: RemoteCommand) -> Self {
        Self::single(command)
    }
}

/// Single-quote a string for POSIX sh. Embedded single quotes become the
/// `'\''` dance.
pub fn sh_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sh_quote_plain() {
        assert_eq!(sh_quote("abc"), "'abc'");
        assert_eq!(sh_quote(""), "''");
    }

    #[test]
    fn test_sh_quote_embedded_quote() {
        assert_eq!(sh_quote("it's"), "'it'\\''s'");
    }

    #[test]
    fn test_rendered_quotes_every_element() {
        let cmd = RemoteCommand::new("tar")
            .args(["-czf", "/root/backup.tar.gz", "-C"])
            .arg("/var/www/html")
            .arg("dvwa");
        assert_eq!(
            cmd.rendered(),
            "'tar' '-czf' '/root/backup.tar.gz' '-C' '/var/www/html' 'dvwa'"
        );
    }

    #[test]
    fn test_hostile_argument_stays_inert() {
        let cmd = RemoteCommand::new("mysql").arg("-e").arg("x'; rm -rf / #");
        // The injection attempt survives only as quoted data.
        assert_eq!(cmd.rendered(), "'mysql' '-e' 'x'\\''; rm -rf / #'");
    }

    #[test]
    fn test_redirections() {
        let dump = RemoteCommand::new("mysqldump")
            .arg("dvwa")
            .stdout_to("/root/db.sql");
        assert_eq!(dump.rendered(), "'mysqldump' 'dvwa' > '/root/db.sql'");

        let replay = RemoteCommand::new("mysql")
            .arg("dvwa")
            .stdin_from("/tmp/db.sql");
        assert_eq!(replay.rendered(), "'mysql' 'dvwa' < '/tmp/db.sql'");
    }

    #[test]
    fn test_script_chains_with_and() {
        let script = RemoteScript::all([
            RemoteCommand::new("mv")
                .arg("/tmp/restore_config.xml")
                .arg("/cf/conf/config.xml"),
            RemoteCommand::new("reboot"),
        ]);
        assert_eq!(
            script.rendered(),
            "'mv' '/tmp/restore_config.xml' '/cf/conf/config.xml' && 'reboot'"
        );
    }
}
