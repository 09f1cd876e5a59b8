//! Product plugins: the check/fetch contract and its families

pub mod error;
pub mod pad;
pub mod plugin;
pub mod registry;
pub mod types;
pub mod vendor;
pub mod vendors;

pub use error::ProductError;
pub use plugin::{FetchOutcome, Product, VendorProduct};
pub use registry::ProductRegistry;
pub use types::{InstallerProfile, ProductRecord, Target, UpdateCandidate};
pub use vendor::Vendor;
