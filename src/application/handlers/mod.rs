//! Application handlers.

pub mod relay;

pub use relay::{
    cancellation, CancelHandle, CancelSignal, RelayCommand, RelayConfig, RelayError, RelayHandler,
    RelayOutcome, ThrottledPersister, CANCELLED_DIAGNOSTIC, MISSING_CREDENTIAL_DIAGNOSTIC,
};
