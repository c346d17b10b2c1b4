//! Stowage Database Layer
//!
//! Postgres repositories for buckets, dimensions, file instances, locations and
//! settings, plus the narrow traits the storage manager and variant generator
//! depend on so they can be exercised without a database.

pub mod repositories;
pub mod traits;
pub mod transaction;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use repositories::{
    BucketRepository, DimensionRepository, FileInstanceRepository, FileRepository,
    SettingsRepository,
};
pub use traits::{BucketSource, DimensionSource, InstanceStore, SettingsSource};
pub use transaction::TransactionGuard;

/// Migrations bundled with this crate (`crates/stowage-db/migrations`).
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
