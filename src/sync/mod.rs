//! Synchronization of the configured products with their vendors
//!
//! A run loads the catalog once, drives the check/fetch cycle of every
//! enabled product, saves the catalog once, and exports when the mode asks
//! for it.

mod summary;

pub use summary::{Mode, Outcome, RunSummary};

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use futures::future::join_all;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::catalog::{Catalog, CatalogStore};
use crate::config::{Config, ConfigError, FETCH_STAGGER_DELAY_MS, ProductEntry};
use crate::error::Error;
use crate::export::export;
use crate::product::error::ProductError;
use crate::product::plugin::{FetchOutcome, Product, VendorProduct};
use crate::product::registry::ProductRegistry;
use crate::product::types::ProductRecord;
use crate::product::vendor::Vendor;
use crate::transport::Transport;

/// Drives runs over a validated configuration
pub struct Synchronizer {
    config: Config,
    store: CatalogStore,
    products: Vec<(ProductEntry, Arc<dyn Vendor>)>,
    transport: Arc<dyn Transport>,
}

impl Synchronizer {
    /// Resolves the family of every enabled product.
    ///
    /// Unknown families and invalid family options are reported here, before
    /// any file or network activity.
    pub fn new(
        config: Config,
        registry: &ProductRegistry,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ConfigError> {
        let products = config
            .enabled_products()
            .map(|entry| Ok::<_, ConfigError>((entry.clone(), registry.vendor_for(entry)?)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            store: CatalogStore::new(config.catalog_path()),
            config,
            products,
            transport,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Executes one run in the given mode.
    ///
    /// Product failures are recorded in the summary. Only catalog and export
    /// I/O failures abort the run.
    pub async fn run(&self, mode: Mode) -> Result<RunSummary, Error> {
        info!(
            "Starting appdownload ({}), catalog {:?}",
            mode,
            self.store.path()
        );

        let mut catalog = self.store.load()?;

        let mut outcomes = if mode == Mode::ExportOnly {
            debug!("Export-only run, products are not processed");
            HashMap::new()
        } else {
            let outcomes = self.process_products(&mut catalog, mode).await;
            self.store.save(&catalog)?;
            outcomes
        };

        let mut summary = RunSummary::new(mode);
        for entry in &self.config.products {
            let outcome = if !entry.enabled {
                Outcome::Disabled
            } else {
                outcomes.remove(&entry.id).unwrap_or(Outcome::Skipped)
            };
            summary.outcomes.push((entry.id.clone(), outcome));
        }

        if mode.exports() {
            let report = export(&self.config, &catalog, &self.config.core.store, Local::now())?;
            summary.export = Some(report);
        }

        info!(
            "appdownload ({}) finished, {} failure(s)",
            mode,
            summary.failures()
        );
        Ok(summary)
    }

    /// Runs every enabled product concurrently, then folds the records back
    /// into the catalog once all of them are done.
    async fn process_products(
        &self,
        catalog: &mut Catalog,
        mode: Mode,
    ) -> HashMap<String, Outcome> {
        let futures = self
            .products
            .iter()
            .enumerate()
            .map(|(i, (entry, vendor))| {
                let delay = Duration::from_millis(FETCH_STAGGER_DELAY_MS * i as u64);
                let prior = catalog.get(&entry.id).cloned();
                let mut product =
                    VendorProduct::new(&entry.id, vendor.clone(), self.transport.clone());
                async move {
                    sleep(delay).await;
                    let known = prior.is_some();
                    product.load(prior);
                    let outcome = run_cycle(&mut product, mode, &entry.path).await;
                    (known, product.dump(), outcome)
                }
            });

        let results = join_all(futures).await;

        let mut outcomes = HashMap::new();
        for (known, record, outcome) in results {
            if known || worth_recording(&record) {
                catalog.insert(record.id.clone(), record.clone());
            } else {
                debug!("'{}' has nothing to record yet", record.id);
            }
            outcomes.insert(record.id, outcome);
        }
        outcomes
    }
}

/// A product seen for the first time is recorded once it has a version or a
/// pending update
fn worth_recording(record: &ProductRecord) -> bool {
    record.current_version().is_some() || record.update_available()
}

/// Runs the cycle of one product, turning its failure into an outcome
async fn run_cycle<P: Product + ?Sized>(product: &mut P, mode: Mode, destination: &Path) -> Outcome {
    match cycle(product, mode, destination).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("'{}' failed: {}", product.id(), e);
            Outcome::Failed {
                error: e.to_string(),
            }
        }
    }
}

async fn cycle<P: Product + ?Sized>(
    product: &mut P,
    mode: Mode,
    destination: &Path,
) -> Result<Outcome, ProductError> {
    if mode.checks() {
        match product.check_update().await? {
            None => {
                return Ok(Outcome::UpToDate {
                    version: product.dump().version,
                });
            }
            Some(candidate) if !mode.fetches() => {
                return Ok(Outcome::UpdateFound {
                    version: candidate.version,
                    published: candidate.published,
                });
            }
            Some(_) => {}
        }
    }

    if !mode.fetches() {
        return Ok(Outcome::Skipped);
    }

    match product.fetch_update(destination).await? {
        FetchOutcome::NothingToFetch => Ok(Outcome::NothingToFetch),
        FetchOutcome::Fetched { version, installer } => {
            Ok(Outcome::Fetched { version, installer })
        }
    }
}
