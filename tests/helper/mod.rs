#![allow(dead_code)]

pub mod transport;

pub use transport::StaticTransport;

use std::path::{Path, PathBuf};

use appdownload::config::Config;

/// Writes a configuration whose store is `store`, followed by `body`
pub fn write_config(dir: &Path, store: &Path, body: &str) -> PathBuf {
    let path = dir.join("appdownload.ini");
    std::fs::write(
        &path,
        format!("[core]\nstore = {}\n\n{}", store.display(), body),
    )
    .unwrap();
    path
}

/// Loads a configuration written by [`write_config`]
pub fn load_config(dir: &Path, store: &Path, body: &str) -> Config {
    Config::load_from(&write_config(dir, store, body)).unwrap()
}

/// Metadata document of the `dummy` family
pub fn dummy_metadata(version: &str, published: &str, location: &str) -> String {
    format!(
        "version = {}\npublished = {}\nlocation = {}\nrelease_note = http://mirror/{}/notes\n",
        version, published, location, version
    )
}

/// Seeds the catalog of `store` with raw INI content
pub fn seed_catalog(store: &Path, content: &str) -> PathBuf {
    std::fs::create_dir_all(store).unwrap();
    let path = store.join("catalog.ini");
    std::fs::write(&path, content).unwrap();
    path
}
