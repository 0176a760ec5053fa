use std::str::FromStr;

use tracing::{info, warn};

/// A trait to control how a value is parsed from an environment string or other config source
/// if it's present.
pub trait ParsableConfigValue: std::fmt::Debug + Sized {
    fn parse_user_value(value: &str) -> Option<Self>;

    /// Parse the value, returning the default if it can't be parsed or the string is empty.
    /// Issue a warning if it can't be parsed.
    fn parse(variable_name: &str, value: Option<String>, default: Self) -> Self {
        match value {
            Some(v) => match Self::parse_user_value(&v) {
                Some(v) => {
                    info!("Config: {variable_name} = {v:?} (user set)");
                    v
                },
                None => {
                    warn!(
                        "Configuration value {v} for {variable_name} cannot be parsed into correct type; reverting to default."
                    );
                    info!("Config: {variable_name} = {default:?} (default due to parse error)");
                    default
                },
            },
            None => default,
        }
    }
}

/// Most values work with the FromStr implementation, but we want to override the behavior for some types
/// (e.g. Option<T> and bool) to have custom parsing behavior.
pub trait FromStrParseable: FromStr + std::fmt::Debug {}

impl<T: FromStrParseable> ParsableConfigValue for T {
    fn parse_user_value(value: &str) -> Option<Self> {
        value.trim().parse::<T>().ok()
    }
}

impl FromStrParseable for usize {}
impl FromStrParseable for u32 {}
impl FromStrParseable for u64 {}
impl FromStrParseable for i64 {}
impl FromStrParseable for f64 {}
impl FromStrParseable for String {}

/// Special handling for bool:
/// - true: "1","true","yes","y","on"  -> true
/// - false: "0","false","no","n","off","" -> false
fn parse_bool_value(value: &str) -> Option<bool> {
    let t = value.trim().to_ascii_lowercase();

    match t.as_str() {
        "0" | "false" | "no" | "n" | "off" | "" => Some(false),
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        _ => None,
    }
}

impl ParsableConfigValue for bool {
    fn parse_user_value(value: &str) -> Option<Self> {
        parse_bool_value(value)
    }
}

/// Enable Option<T> to allow the default value to be None if nothing is set and appear as
/// Some(Value) if the user specifies the value.
impl<T: ParsableConfigValue> ParsableConfigValue for Option<T> {
    fn parse_user_value(value: &str) -> Option<Self> {
        T::parse_user_value(value).map(Some)
    }
}

/// Durations accept the suffixes understood by duration_str, e.g. "500ms", "2s", "1m".
impl ParsableConfigValue for std::time::Duration {
    fn parse_user_value(value: &str) -> Option<Self> {
        duration_str::parse(value.trim()).ok()
    }
}

// Reexport this so that dependencies don't have weird other dependencies
pub use lazy_static::lazy_static;

/// Declares lazily-initialized constants that can be overridden through the environment.
///
/// Each constant `NAME` reads `DRIVE_SYNC_NAME` on first access; if the variable is unset or
/// cannot be parsed, the declared default is used.
///
/// # Example
/// ```rust
/// utils::configurable_constants! {
///    /// Size of a transfer unit.
///    ref TRANSFER_UNIT: u64 = 1024;
/// }
///
/// assert_eq!(*TRANSFER_UNIT, 1024);
/// ```
#[macro_export]
macro_rules! configurable_constants {
    ($(
        $(#[$meta:meta])*
        ref $name:ident : $type:ty = $value:expr;
    )+) => {
        $(
            #[allow(unused_imports)]
            use $crate::configuration_utils::*;

            lazy_static! {
                $(#[$meta])*
                pub static ref $name: $type = {
                    let default_value = $value;
                    let maybe_env_value = std::env::var(concat!("DRIVE_SYNC_", stringify!($name))).ok();
                    <$type>::parse(stringify!($name), maybe_env_value, default_value)
                };
            }
        )+
    };
}
