//! Device registry for a peer-to-peer file-transfer client.
//!
//! Tracks known remote devices and keeps the records that point at them
//! consistent: removing a device through [`DeviceRegistry::remove_device`]
//! deletes its connections and transfer-group assignees, and deletes any
//! transfer group left with no assignee at all. Groups still shared with
//! other devices survive.
//!
//! ```no_run
//! use peerlink_registry::{DeviceRegistry, RegistryConfig};
//! use peerlink_storage::Device;
//!
//! # fn main() -> peerlink_registry::RegistryResult<()> {
//! let registry = DeviceRegistry::open(&RegistryConfig::with_database("devices.duckdb"))?;
//! registry.resume_pending_cascades()?;
//!
//! registry.upsert_device(&Device::new("a1b2"))?;
//! let report = registry.remove_device("a1b2")?;
//! if report.is_partial() {
//!     eprintln!("cleanup incomplete, will retry on next start");
//! }
//! # Ok(())
//! # }
//! ```

mod cascade;
mod collaborators;
mod config;
mod error;
mod locks;
mod logging;
mod registry;

pub use cascade::{CascadeEngine, CascadeFailure, CascadeReport, CascadeStep, RetryPolicy};
pub use collaborators::{PictureStore, ProfilePictures, TransferGroupDirectory};
pub use config::RegistryConfig;
pub use error::{RegistryError, RegistryResult};
pub use locks::GroupLocks;
pub use logging::init_tracing;
pub use registry::DeviceRegistry;
