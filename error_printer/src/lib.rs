//! Log-and-pass-through helpers for `Result` and `Option`.
//!
//! These let call sites record a failure at the point where it is observed without
//! changing control flow, e.g. `transport.delete(url).await.log_error("cleanup failed")`.

use std::fmt::{Debug, Display};
use std::panic::Location;

use tracing::{debug, error, info, warn};

fn caller(location: &Location) -> String {
    format!("{}:{}", location.file(), location.line())
}

/// Logs the error of a `Result` at the requested level and hands the `Result` back unchanged.
pub trait ErrorPrinter {
    fn log_error<M: Display>(self, message: M) -> Self;

    fn warn_error<M: Display>(self, message: M) -> Self;

    fn info_error<M: Display>(self, message: M) -> Self;

    fn debug_error<M: Display>(self, message: M) -> Self;
}

impl<T, E: Debug> ErrorPrinter for Result<T, E> {
    #[track_caller]
    fn log_error<M: Display>(self, message: M) -> Self {
        if let Err(e) = &self {
            let caller = caller(Location::caller());
            error!(caller = %caller, "{message}, error: {e:?}");
        }
        self
    }

    #[track_caller]
    fn warn_error<M: Display>(self, message: M) -> Self {
        if let Err(e) = &self {
            let caller = caller(Location::caller());
            warn!(caller = %caller, "{message}, error: {e:?}");
        }
        self
    }

    #[track_caller]
    fn info_error<M: Display>(self, message: M) -> Self {
        if let Err(e) = &self {
            let caller = caller(Location::caller());
            info!(caller = %caller, "{message}, error: {e:?}");
        }
        self
    }

    #[track_caller]
    fn debug_error<M: Display>(self, message: M) -> Self {
        if let Err(e) = &self {
            let caller = caller(Location::caller());
            debug!(caller = %caller, "{message}, error: {e:?}");
        }
        self
    }
}

/// Logs when an `Option` is `None` and hands it back unchanged.
pub trait OptionPrinter {
    fn error_none<M: Display>(self, message: M) -> Self;

    fn warn_none<M: Display>(self, message: M) -> Self;

    fn info_none<M: Display>(self, message: M) -> Self;
}

impl<T> OptionPrinter for Option<T> {
    #[track_caller]
    fn error_none<M: Display>(self, message: M) -> Self {
        if self.is_none() {
            let caller = caller(Location::caller());
            error!(caller = %caller, "{message}");
        }
        self
    }

    #[track_caller]
    fn warn_none<M: Display>(self, message: M) -> Self {
        if self.is_none() {
            let caller = caller(Location::caller());
            warn!(caller = %caller, "{message}");
        }
        self
    }

    #[track_caller]
    fn info_none<M: Display>(self, message: M) -> Self {
        if self.is_none() {
            let caller = caller(Location::caller());
            info!(caller = %caller, "{message}");
        }
        self
    }
}
