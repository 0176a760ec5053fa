#![cfg_attr(feature = "strict", deny(warnings))]

pub mod auth;
pub mod configuration_utils;
pub mod errors;

// The configurable_constants! macro is exported at the crate root by #[macro_export].
