//! ssh/rsync command builders.
//!
//! The driver runs on an operator machine and reaches both servers over ssh.
//! `BatchMode=yes` makes a missing key an immediate failure instead of a
//! password prompt hanging the run.

use upr_exec::CommandSpec;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteHost {
    pub user: String,
    pub host: String,
    pub port: u16,
}

impl RemoteHost {
    #[must_use]
    pub fn new(user: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            host: host.into(),
            port: 22,
        }
    }

    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn address(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// `ssh -o BatchMode=yes [-p port] user@host <command>`
    #[must_use]
    pub fn ssh(&self, command: &str) -> CommandSpec {
        let mut spec = CommandSpec::new("ssh").args(["-o", "BatchMode=yes"]);
        if self.port != 22 {
            spec = spec.args(["-p", &self.port.to_string()]);
        }
        spec.arg(self.address()).arg(command)
    }

    /// Same, feeding `payload` to the remote command's stdin.
    #[must_use]
    pub fn ssh_with_stdin(&self, command: &str, payload: impl Into<String>) -> CommandSpec {
        self.ssh(command).stdin(payload)
    }
}

/// Copy `path` from `source` to `dest` at the same absolute path. The copy
/// runs on the destination, pulling over ssh, so the operator machine never
/// stages the data.
#[must_use]
pub fn transfer(source: &RemoteHost, dest: &RemoteHost, path: &str) -> CommandSpec {
    let parent = std::path::Path::new(path)
        .parent()
        .map_or_else(|| "/".to_string(), |p| p.display().to_string());
    let pull = format!(
        "mkdir -p {parent} && rsync -az -e 'ssh -o BatchMode=yes' {}:{path} {parent}/",
        source.address()
    );
    dest.ssh(&pull)
}
