use crate::dialect::Dialect;
use netreach_model::{ProbeRequest, RouteRequest};
use std::fmt;
use std::process::Command;

/// A fully built external command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
}

impl CommandSpec {
    fn new(program: &str, dialect: Dialect) -> Self {
        let envs = match dialect {
            // Pin the English output the POSIX grammars are written against.
            Dialect::Posix => vec![("LC_ALL".to_string(), "C".to_string())],
            Dialect::Windows => Vec::new(),
        };
        Self {
            program: program.to_string(),
            args: Vec::new(),
            envs,
        }
    }

    fn arg(mut self, value: impl ToString) -> Self {
        self.args.push(value.to_string());
        self
    }

    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        for (key, value) in &self.envs {
            command.env(key, value);
        }
        command
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

pub fn ping_command(request: &ProbeRequest, dialect: Dialect) -> CommandSpec {
    match dialect {
        Dialect::Windows => CommandSpec::new("ping", dialect)
            .arg("-n")
            .arg(request.count())
            .arg("-w")
            .arg(u64::from(request.timeout_secs()) * 1000)
            .arg(request.host()),
        Dialect::Posix => CommandSpec::new("ping", dialect)
            .arg("-c")
            .arg(request.count())
            .arg("-W")
            .arg(request.timeout_secs())
            .arg(request.host()),
    }
}

pub fn route_command(request: &RouteRequest, dialect: Dialect) -> CommandSpec {
    match dialect {
        Dialect::Windows => CommandSpec::new("tracert", dialect)
            .arg("-h")
            .arg(request.max_hops())
            .arg("-w")
            .arg(u64::from(request.timeout_secs()) * 1000)
            .arg(request.host()),
        Dialect::Posix => CommandSpec::new("traceroute", dialect)
            .arg("-m")
            .arg(request.max_hops())
            .arg("-w")
            .arg(request.timeout_secs())
            .arg(request.host()),
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub status: String,
    /// stdout followed by stderr.
    pub text: String,
}

/// Runs a command to completion. The seam tests replace to feed canned output.
pub trait CommandRunner: Send + Sync {
    fn run(&self, spec: &CommandSpec) -> std::io::Result<CommandOutput>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, spec: &CommandSpec) -> std::io::Result<CommandOutput> {
        log::debug!("running {spec}");
        let output = spec.to_command().output()?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&stderr);
        }

        Ok(CommandOutput {
            success: output.status.success(),
            status: output.status.to_string(),
            text,
        })
    }
}
