use crate::tap::error::Error;
use crate::tap_error;

/// Decides what happens with a failure that occurred inside a host callback.
///
/// Implementations must not panic: a failure in output capture never affects
/// the debugging session itself.
pub trait FailurePolicy: Send + Sync {
    fn on_failure(&self, err: &Error);
}

/// Put failure into diagnostic logs and carry on.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnly;

impl FailurePolicy for LogOnly {
    fn on_failure(&self, err: &Error) {
        tap_error!("{err:#}");
    }
}
