//! Product family implementations

pub mod dummy;
pub mod github;
pub mod makemkv;

pub use dummy::DummyVendor;
pub use github::GitHubVendor;
pub use makemkv::MakeMkvVendor;
