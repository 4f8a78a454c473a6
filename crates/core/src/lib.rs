pub mod config;
pub mod error;
pub mod key;
pub mod lifecycle;
pub mod payload;
pub mod store;

pub use config::{BucketConfig, BucketRole};
pub use error::{ErrorKind, StorageError};
pub use lifecycle::{DeleteSummary, StorageLifecycleManager};
pub use payload::Payload;
