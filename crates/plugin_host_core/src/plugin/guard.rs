//! Failure containment around plugin calls.
//!
//! Every call into plugin code goes through [`guarded`], which turns both
//! returned errors and panics into a [`PluginError`].

use crate::error::{PluginError, PluginResult};
use crate::logging::sanitize_message;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

const MAX_PANIC_MESSAGE_CHARS: usize = 240;

/// Runs one plugin call, converting a panic into [`PluginError::Panicked`].
///
/// Plugin state touched by a panicking call is not rolled back; callers
/// drop or skip the plugin instead of reusing it where that matters.
pub(crate) fn guarded<T>(call: impl FnOnce() -> PluginResult<T>) -> PluginResult<T> {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(payload) => Err(PluginError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let message = if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    };
    sanitize_message(&message, MAX_PANIC_MESSAGE_CHARS)
}

#[cfg(test)]
mod tests {
    use super::guarded;
    use crate::error::PluginError;

    #[test]
    fn passes_results_through() {
        assert_eq!(guarded(|| Ok(3)).unwrap(), 3);
        let err = guarded::<()>(|| Err(PluginError::failed("nope"))).unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }

    #[test]
    fn converts_panics() {
        let err = guarded::<()>(|| panic!("bubble\nburst")).unwrap_err();
        match err {
            PluginError::Panicked(message) => assert_eq!(message, "bubble burst"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
