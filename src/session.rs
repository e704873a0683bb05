//! Diagnostics collector shared across the pipeline.
//!
//! The scanner, parser and resolver accumulate static errors here; the
//! interpreter records at most one runtime error per run.  The driver
//! consults the flags between phases (a later phase only runs when the
//! earlier phases left the session clean) and to choose its exit code.

use std::cell::Cell;

use log::info;

use crate::error::LoxError;

#[derive(Debug, Default)]
pub struct Session {
    had_error: Cell<bool>,
    had_runtime_error: Cell<bool>,
}

impl Session {
    pub fn new() -> Self {
        Session::default()
    }

    /// Report a static (lex/parse/resolve) diagnostic to stderr.
    pub fn report(&self, err: &LoxError) {
        info!("static error reported: {}", err);

        eprintln!("{}", err);
        self.had_error.set(true);
    }

    /// Report a runtime error to stderr.
    pub fn report_runtime(&self, err: &LoxError) {
        info!("runtime error reported: {}", err);

        eprintln!("{}", err);
        self.had_runtime_error.set(true);
    }

    pub fn had_error(&self) -> bool {
        self.had_error.get()
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error.get()
    }

    /// Clear the static-error flag so one bad REPL line does not poison
    /// the next.  The runtime flag is left alone.
    pub fn reset(&self) {
        self.had_error.set(false);
    }
}
