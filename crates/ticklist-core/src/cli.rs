use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "ticklist",
    version,
    about = "Ticklist: a menu-bar to-do list driven over stdio",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Drive a tray host over stdin/stdout (default).
    Run,
    /// Add a task to the top of the list.
    Add {
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Print tasks, newest first.
    List {
        #[arg(long)]
        completed: bool,
    },
    /// Mark a task complete.
    Done { task: String },
    /// Replace a task's text.
    Edit {
        task: String,
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        text: Vec<String>,
    },
    Delete {
        task: String,
        #[arg(long)]
        completed: bool,
    },
    ClearCompleted,
    /// Remove every pending and completed task.
    ClearAll {
        #[arg(long)]
        yes: bool,
    },
    Prefs,
    Set { key: String, value: String },
    /// Print the tray menu as JSON.
    Menu,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    // stdout carries the host protocol
    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls bare `rc.KEY=VALUE` (or `rc.KEY:VALUE`) tokens out before clap
/// sees them.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = rest
                .split_once('=')
                .or_else(|| rest.split_once(':'))
                .map(|(k, v)| (format!("rc.{k}"), v.to_string()));

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[test]
    fn positional_rc_tokens_become_overrides() {
        let pre = preprocess_args(&args(&[
            "ticklist",
            "rc.accent.debounce_ms=10",
            "list",
            "rc.login.enabled:on",
        ]))
        .expect("preprocess");

        assert_eq!(pre.cleaned_args, args(&["ticklist", "list"]));
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.accent.debounce_ms".to_string(), "10".to_string()),
                ("rc.login.enabled".to_string(), "on".to_string()),
            ]
        );
    }

    #[test]
    fn subcommands_parse() {
        let cli = GlobalCli::parse_from(["ticklist", "-vv", "add", "buy", "milk"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(
            cli.command,
            Some(Command::Add {
                text: vec!["buy".to_string(), "milk".to_string()]
            })
        );

        let cli = GlobalCli::parse_from(["ticklist", "--rc", "editor.origin.y=10"]);
        assert_eq!(cli.command, None);
        assert_eq!(cli.rc_overrides[0].key, "editor.origin.y");

        let cli = GlobalCli::parse_from(["ticklist", "clear-all", "--yes"]);
        assert_eq!(cli.command, Some(Command::ClearAll { yes: true }));
    }

    #[test]
    fn keyval_requires_equals() {
        assert!("no-equals".parse::<KeyVal>().is_err());
    }
}
