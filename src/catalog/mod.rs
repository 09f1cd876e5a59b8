//! Persistent catalog of product records

mod store;

pub use store::{CATALOG_SCHEME, Catalog, CatalogError, CatalogStore, render};
