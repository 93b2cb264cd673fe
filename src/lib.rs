//! Debug Adapter Protocol output capture.
//!
//! [`tap::SessionOutputLogger`] follows the host's workspace, resets a log
//! file at the start of every debugging session and appends the text of every
//! `output` event the debug adapter sends toward the client.

pub mod dap;
pub mod log;
pub mod tap;
