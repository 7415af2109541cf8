//! Application layer - Handlers orchestrating domain operations across ports.

pub mod handlers;

pub use handlers::{
    cancellation, CancelHandle, CancelSignal, RelayCommand, RelayConfig, RelayError, RelayHandler,
    RelayOutcome, ThrottledPersister,
};
