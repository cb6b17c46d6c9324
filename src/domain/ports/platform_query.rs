//! PlatformQuery port - read-only questions about the hosting platform

use crate::error::BatonResult;

/// Abstract platform state queries
///
/// Implementations:
/// - `HttpPlatformQuery` - GET against the configured version endpoint
pub trait PlatformQuery: Send + Sync {
    /// The version currently serving live traffic
    fn current_live_version(&self) -> BatonResult<String>;
}
