//! Terminal detection for wizard sessions.

use std::env;
use std::io;
use std::sync::OnceLock;

use crossterm::tty::IsTty;

/// Colour switches read from the environment.
///
/// `NO_COLOR` (any value), `CLICOLOR=0` and `TERM=dumb` turn colour off;
/// `CLICOLOR_FORCE` (any value) turns it on for non-TTY output. Off wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColorEnv {
    pub no_color: bool,
    pub clicolor_off: bool,
    pub dumb_term: bool,
    pub force: bool,
}

impl ColorEnv {
    pub fn from_env() -> Self {
        Self {
            no_color: env::var_os("NO_COLOR").is_some(),
            clicolor_off: env::var("CLICOLOR").as_deref() == Ok("0"),
            dumb_term: env::var("TERM").as_deref() == Ok("dumb"),
            force: env::var_os("CLICOLOR_FORCE").is_some(),
        }
    }

    /// Whether to emit ANSI colour, given whether stdout is a terminal.
    pub fn enabled(self, stdout_tty: bool) -> bool {
        if self.no_color || self.clicolor_off || self.dumb_term {
            return false;
        }
        self.force || stdout_tty
    }
}

pub fn stdout_is_tty() -> bool {
    io::stdout().is_tty()
}

/// Whether a person is typing at the session.
///
/// Prompts and the reset confirmation question are only shown then, so
/// piped sessions produce clean output.
pub fn interactive_session() -> bool {
    io::stdin().is_tty()
}

/// Whether render helpers colour their output. Decided once per process.
pub fn supports_color() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| ColorEnv::from_env().enabled(stdout_is_tty()))
}
