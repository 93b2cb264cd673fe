//! Logging macros with the crate's default target.
//!
//! Core diagnostics go to target `tap`, transport and host diagnostics pass
//! `target: "dap"` explicitly.

#[macro_export]
macro_rules! tap_info {
    (target: $target:expr, $($arg:tt)+) => { ::log::info!(target: $target, $($arg)+) };
    ($($arg:tt)+) => { ::log::info!(target: "tap", $($arg)+) };
}

#[macro_export]
macro_rules! tap_warn {
    (target: $target:expr, $($arg:tt)+) => { ::log::warn!(target: $target, $($arg)+) };
    ($($arg:tt)+) => { ::log::warn!(target: "tap", $($arg)+) };
}

#[macro_export]
macro_rules! tap_error {
    (target: $target:expr, $($arg:tt)+) => { ::log::error!(target: $target, $($arg)+) };
    ($($arg:tt)+) => { ::log::error!(target: "tap", $($arg)+) };
}

#[macro_export]
macro_rules! tap_debug {
    (target: $target:expr, $($arg:tt)+) => { ::log::debug!(target: $target, $($arg)+) };
    ($($arg:tt)+) => { ::log::debug!(target: "tap", $($arg)+) };
}
