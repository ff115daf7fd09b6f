//! Configuration error types.

use thiserror::Error;

use crate::ItemId;

/// Errors raised by [`crate::FilterEngine::install`].
///
/// All variants are synchronous and all-or-nothing: a failed install leaves
/// the previously installed configuration fully in effect, performs no
/// resets, and does not advance the version counter.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A filter spec declared no processors.
    #[error("filter processors must be specified")]
    MissingProcessors,

    /// The same tiled image appears in more than one item set.
    #[error("item {0:?} reused across filters")]
    ItemReused(ItemId),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
