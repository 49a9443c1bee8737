//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::session::{ProtocolKind, Session};

/// Send administrative commands to a remote server over RCON, Telnet or
/// WebRCON. Without a command, starts an interactive session.
#[derive(Parser, Debug, Default)]
#[command(name = "rcon", version)]
pub struct Cli {
    /// Address of the server (host:port).
    #[arg(short, long, value_name = "HOST:PORT", default_value = "")]
    pub address: String,

    /// Password of the server.
    #[arg(short, long, default_value = "", hide_default_value = true)]
    pub password: String,

    /// Command to execute. Enables one-shot mode.
    #[arg(short, long)]
    pub command: Option<String>,

    /// Profile in the configuration file to read credentials from.
    #[arg(short, long, value_name = "NAME")]
    pub env: Option<String>,

    /// File the executed commands are logged to.
    #[arg(short, long, value_name = "PATH")]
    pub log: Option<PathBuf>,

    /// Configuration file with profiles.
    #[arg(long, value_name = "PATH")]
    pub cfg: Option<PathBuf>,

    /// Protocol: rcon, telnet or web.
    #[arg(short = 't', long = "type", value_name = "TYPE", default_value = "")]
    pub protocol: String,

    /// Connect and read timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Increase diagnostic verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Command words, used when `--command` is not given.
    #[arg(value_name = "COMMAND", trailing_var_arg = true, allow_hyphen_values = true)]
    pub words: Vec<String>,
}

impl Cli {
    /// Connection values given on the command line. Empty fields are
    /// filled from the configuration profile.
    pub fn overrides(&self) -> Session {
        Session {
            address: self.address.trim().to_string(),
            password: self.password.clone(),
            protocol: ProtocolKind::from_name(&self.protocol),
            log: self.log.clone().filter(|path| !path.as_os_str().is_empty()),
        }
    }

    /// The command for one-shot mode, or `None` for interactive mode.
    /// An empty `--command` counts as not given.
    pub fn command_text(&self) -> Option<String> {
        if let Some(command) = self.command.as_ref().filter(|c| !c.is_empty()) {
            return Some(command.clone());
        }
        if self.words.is_empty() {
            None
        } else {
            Some(self.words.join(" "))
        }
    }
}
