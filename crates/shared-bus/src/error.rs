//! Error types for the scoped bus.

use shared_types::HandlerError;
use thiserror::Error;

/// Errors surfaced by `publish` and `subscribe`.
///
/// The bus never swallows subscriber failures: the first failing callback
/// aborts the current delivery and its error is returned to the caller.
#[derive(Debug, Error)]
pub enum BusError {
    /// A subscriber callback failed while handling a record.
    #[error("Subscriber for {scope}/{event_name} failed on event #{sequence}: {source}")]
    Handler {
        scope: String,
        event_name: String,
        sequence: u64,
        #[source]
        source: HandlerError,
    },
}
