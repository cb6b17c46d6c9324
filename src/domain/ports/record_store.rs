//! RecordStore port - persistence of the deploy record
//!
//! The store knows the on-disk format and where the record lives inside a
//! lock directory; the domain layer only sees `DeployRecord` values.

use std::path::Path;

use crate::domain::entities::DeployRecord;
use crate::error::BatonResult;

/// Abstract record persistence
///
/// Implementations:
/// - `PropFileStore` - `key=value` file inside the lock directory
pub trait RecordStore: Send + Sync {
    /// Read the record from a lock directory
    ///
    /// Fails `NotFound` when no record file exists, `Corrupt` when the
    /// record's own lock-directory field disagrees with `dir`.
    fn load(&self, dir: &Path) -> BatonResult<DeployRecord>;

    /// Write the record into its own lock directory, atomically
    fn save(&self, record: &DeployRecord) -> BatonResult<()>;

    /// Whether a record file currently exists in `dir`
    fn exists(&self, dir: &Path) -> bool;
}
