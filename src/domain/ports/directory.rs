//! DirectoryLookup port - deployer identity to chat-mention handle

use crate::error::BatonResult;

/// Abstract people-directory lookup
///
/// Implementations:
/// - `ChatDirectory` - GET against the configured directory endpoint
pub trait DirectoryLookup: Send + Sync {
    /// Mention handle for an identity; `Ok(None)` when the directory does
    /// not know them, `Err` when the lookup itself failed
    ///
    /// Callers fall back to a deterministic guess in both non-Ok-Some cases.
    fn mention_for(&self, identity: &str) -> BatonResult<Option<String>>;
}
