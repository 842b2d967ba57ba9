use std::{
    fs,
    io::{self, BufRead, IsTerminal, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use getset::{CopyGetters, Getters};
use tracing::info;

use crate::{calendar, client::Credentials, errors::ReportError, processor::RunOptions};

const NOISY_TARGETS: [&str; 5] = ["reqwest", "hyper", "hyper_util", "rustls", "h2"];
const USER_ENV_VARS: [&str; 4] = ["LOGNAME", "USER", "LNAME", "USERNAME"];

/// Back-fill overdue weekly time reports.
#[derive(Debug, Parser)]
#[command(name = "overdue-backfill")]
#[command(author, version, about, long_about = None)]
#[command(group(
    ArgGroup::new("action")
        .required(true)
        .args(["csv", "calendar", "list_overdue"])
))]
#[command(after_help = "Set OVERDUE_CALENDAR_REGEX to control which calendar events count as \
time off. Matching is always case-insensitive.")]
pub struct Cli {
    /// Username. Defaults to the login name.
    #[arg(long)]
    pub user: Option<String>,

    /// Plain text password file. For testing only.
    #[arg(long)]
    pub pwdfile: Option<PathBuf>,

    #[arg(long, env = "OVERDUE_PASSWD", hide = true, hide_env_values = true)]
    pub passwd: Option<String>,

    /// Match and log without submitting.
    #[arg(short = 'n', long)]
    pub dryrun: bool,

    /// Only log warnings and errors.
    #[arg(short, long)]
    pub quiet: bool,

    /// Log debug details.
    #[arg(short, long)]
    pub debug: bool,

    /// Submit only one week, then exit.
    #[arg(short, long)]
    pub once: bool,

    /// Format: date,M,T,W,R,F (empty column means 8 hours worked that day).
    #[arg(long, value_name = "FILE")]
    pub csv: Option<PathBuf>,

    /// Load data from the calendar.
    #[arg(long, alias = "exch")]
    pub calendar: bool,

    /// List overdue dates and exit.
    #[arg(long)]
    pub list_overdue: bool,

    /// Time-reporting backend URL.
    #[arg(long, env = "OVERDUE_BACKEND_URL", default_value = "http://localhost:8080")]
    pub backend_url: String,

    /// Calendar server URL.
    #[arg(long, env = "OVERDUE_CALENDAR_URL")]
    pub calendar_url: Option<String>,

    /// Subjects of calendar events that count as time off.
    #[arg(long, env = calendar::REGEX_ENV, default_value = calendar::DEFAULT_REGEX)]
    pub calendar_regex: String,

    /// Timeout for each remote call, in seconds.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

impl Cli {
    /// `tracing` filter directives for the chosen verbosity.
    pub fn log_directives(&self) -> String {
        let level = if self.debug {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        };
        std::iter::once(level.to_string())
            .chain(NOISY_TARGETS.iter().map(|target| format!("{target}=error")))
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceChoice {
    Csv(PathBuf),
    Calendar { url: String, pattern: String },
    ListOverdue,
}

/// Resolved configuration of one run.
#[derive(Debug, Getters, CopyGetters)]
pub struct Settings {
    #[getset(get = "pub")]
    credentials: Credentials,
    #[getset(get = "pub")]
    backend_url: String,
    #[getset(get = "pub")]
    source: SourceChoice,
    #[getset(get_copy = "pub")]
    options: RunOptions,
    #[getset(get_copy = "pub")]
    timeout: Duration,
}

impl Settings {
    /// Resolves credentials and the data source from the command line.
    ///
    /// Prompts on the terminal, without echo, when no password was given.
    /// A piped stdin is read as one line instead.
    pub fn resolve(cli: Cli) -> Result<Self> {
        Self::resolve_with(cli, |name| std::env::var(name).ok(), |prompt| {
            let stdin = io::stdin();
            if stdin.is_terminal() {
                Ok(rpassword::prompt_password(prompt)?)
            } else {
                read_password_line(prompt, &mut stdin.lock())
            }
        })
    }

    fn resolve_with<E, P>(cli: Cli, env: E, prompt: P) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
        P: FnOnce(&str) -> Result<String>,
    {
        let user = match cli.user {
            Some(user) => user,
            None => {
                let user = USER_ENV_VARS
                    .iter()
                    .find_map(|name| env(name).filter(|v| !v.is_empty()))
                    .context("no user specified and no login name in the environment")?;
                info!(%user, "no user specified, using login name");
                user
            }
        };

        let password = match (cli.pwdfile, cli.passwd) {
            (Some(path), _) => read_password_file(&path)?,
            (None, Some(password)) => password,
            (None, None) => {
                let password = prompt(&format!("Enter passwd for '{user}':"))?;
                if password.is_empty() {
                    Err(ReportError::MissingPassword(user.clone()))?
                }
                password
            }
        };

        let source = if let Some(path) = cli.csv {
            SourceChoice::Csv(path)
        } else if cli.calendar {
            SourceChoice::Calendar {
                url: cli.calendar_url.ok_or(ReportError::MissingCalendarUrl)?,
                pattern: cli.calendar_regex,
            }
        } else {
            SourceChoice::ListOverdue
        };

        Ok(Self {
            credentials: Credentials::new(user, password),
            backend_url: cli.backend_url,
            source,
            options: RunOptions {
                dry_run: cli.dryrun,
                once: cli.once,
            },
            timeout: Duration::from_secs(cli.timeout_secs),
        })
    }
}

fn read_password_file(path: &Path) -> Result<String> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("cannot read password file {}", path.display()))?;
    Ok(content.lines().next().unwrap_or_default().trim_end().to_string())
}

fn read_password_line<R: BufRead>(prompt: &str, input: &mut R) -> Result<String> {
    eprint!("{prompt}");
    io::stderr().flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
