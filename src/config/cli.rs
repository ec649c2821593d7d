//! Command-line surface.

use std::ffi::OsString;

use clap::Parser;

/// Path-based reverse proxy with an optional supervised command.
#[derive(Debug, Clone, Parser, PartialEq, Eq)]
#[command(name = "path-proxy", version)]
#[command(about = "Forward requests to upstreams by path prefix, optionally tied to a child process")]
pub struct Cli {
    /// Listening address
    #[arg(long, default_value = ":9001")]
    pub addr: String,

    /// Show logs
    #[arg(long)]
    pub verbose: bool,

    /// Default to the http scheme for targets without one
    #[arg(long)]
    pub insecure: bool,

    /// Routes, one `<path>=<target>` per argument
    #[arg(value_name = "PATH=TARGET")]
    pub routes: Vec<String>,

    /// Command to run; the proxy stops when it exits
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl Cli {
    /// Parse from the process arguments, accepting single-dash long flags.
    pub fn parse_args() -> Self {
        Self::parse_from(normalize_legacy_flags(std::env::args_os()))
    }
}

const LEGACY_FLAGS: [&str; 3] = ["addr", "verbose", "insecure"];

/// Rewrite `-addr`, `-addr=x`, `-verbose` and `-insecure` into their `--` forms.
///
/// Arguments after the first `--` belong to the command and are left alone.
pub fn normalize_legacy_flags<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut seen_terminator = false;
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            if seen_terminator {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "--" {
                seen_terminator = true;
                return arg;
            }
            match text.strip_prefix('-') {
                Some(rest) if !rest.starts_with('-') => {
                    let name = rest.split('=').next().unwrap_or(rest);
                    if LEGACY_FLAGS.contains(&name) {
                        OsString::from(format!("-{text}"))
                    } else {
                        arg
                    }
                }
                _ => arg,
            }
        })
        .collect()
}
