//! Version ordering
//!
//! Product versions are compared as semantic versions when possible. Vendors
//! that publish four-part or partial numeric versions (e.g. "32.0.0.171",
//! "1.17") are compared component by component.

pub mod semver;
