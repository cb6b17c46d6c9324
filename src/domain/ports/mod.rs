//! Domain Ports (Interfaces)
//!
//! These traits define the boundaries of the domain layer.
//! Infrastructure layer provides concrete implementations.

pub mod clock;
pub mod deploy_executor;
pub mod directory;
pub mod notifier;
pub mod platform_query;
pub mod record_store;
pub mod version_control;
pub mod version_namer;

pub use clock::Clock;
pub use deploy_executor::{CredentialRef, DeployExecutor, MonitoringBaseline, WatchVerdict};
pub use directory::DirectoryLookup;
pub use notifier::{Color, Notice, Notifier, Severity};
pub use platform_query::PlatformQuery;
pub use record_store::RecordStore;
pub use version_control::VersionControl;
pub use version_namer::VersionNamer;
