pub mod catalog;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod product;
pub mod sync;
pub mod transport;
pub mod version;

pub use error::Error;
