//! logging.rs
//!
//! Tracing subscriber for the binary. Logs go to stderr; stdout stays free
//! for the editor and the final report.
//!
//! Filter priority (highest first):
//! 1. `SONORA_LOG` (directives, e.g. `sonora_bulk=debug,warn`)
//! 2. `RUST_LOG`
//! 3. `-v` / `-q`
//! 4. default: `warn` for dependencies, `info` for this crate

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

pub const ENV_LOG: &str = "SONORA_LOG";

const CRATE_TARGET: &str = "sonora_bulk";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    pub const fn from_flags(verbose: bool, quiet: bool) -> Self {
        if verbose {
            Self::Verbose
        } else if quiet {
            Self::Quiet
        } else {
            Self::Normal
        }
    }

    /// Directive used when neither env var is set.
    fn default_directive(self) -> String {
        match self {
            Self::Quiet => "error".to_string(),
            Self::Normal => format!("warn,{CRATE_TARGET}=info"),
            Self::Verbose => format!("info,{CRATE_TARGET}=debug"),
        }
    }
}

/// Install the global subscriber. Call once, first thing in `main`.
pub fn init_subscriber(verbosity: Verbosity, no_color: bool) {
    let filter = build_env_filter(verbosity, std::env::var(ENV_LOG).ok());
    let use_ansi = !no_color && std::io::IsTerminal::is_terminal(&std::io::stderr());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(use_ansi)
        .with_target(verbosity == Verbosity::Verbose)
        .without_time()
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

fn build_env_filter(verbosity: Verbosity, sonora_log: Option<String>) -> EnvFilter {
    // An unparseable SONORA_LOG falls through instead of failing.
    if let Some(directives) = sonora_log
        && let Ok(filter) = EnvFilter::try_new(&directives)
    {
        return filter;
    }

    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    EnvFilter::try_new(verbosity.default_directive()).unwrap_or_else(|_| EnvFilter::new("warn"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_wins_over_quiet() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn default_directives_parse() {
        for v in [Verbosity::Quiet, Verbosity::Normal, Verbosity::Verbose] {
            assert!(EnvFilter::try_new(v.default_directive()).is_ok(), "{v:?}");
        }
        assert_eq!(Verbosity::Quiet.default_directive(), "error");
    }

    #[test]
    fn explicit_directives_take_priority() {
        let filter = build_env_filter(Verbosity::Quiet, Some("sonora_bulk=trace".into()));
        assert!(filter.to_string().contains("sonora_bulk=trace"));
    }
}
