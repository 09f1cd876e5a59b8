//! Transport test utilities

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use appdownload::transport::{Transport, TransportError};

/// Transport serving documents held in memory
#[derive(Default)]
pub struct StaticTransport {
    documents: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl StaticTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, location: &str, content: impl Into<Vec<u8>>) -> Self {
        self.documents.insert(location.to_string(), content.into());
        self
    }

    /// Locations requested so far, in request order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn was_requested(&self, location: &str) -> bool {
        self.requests().iter().any(|r| r == location)
    }
}

#[async_trait]
impl Transport for StaticTransport {
    async fn retrieve(&self, location: &str, destination: &Path) -> Result<u64, TransportError> {
        self.requests.lock().unwrap().push(location.to_string());
        match self.documents.get(location) {
            Some(content) => {
                std::fs::write(destination, content).map_err(|source| TransportError::Io {
                    path: destination.to_path_buf(),
                    source,
                })?;
                Ok(content.len() as u64)
            }
            None => Err(TransportError::NotFound(location.to_string())),
        }
    }
}
