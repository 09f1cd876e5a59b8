//! Name-to-implementation table of product families

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{ConfigError, ProductEntry};
use crate::product::vendor::Vendor;
use crate::product::vendors::{DummyVendor, GitHubVendor, MakeMkvVendor, dummy, github, makemkv};

/// Builds the vendor of a configured product, validating its family options
pub type VendorFactory =
    Arc<dyn Fn(&ProductEntry) -> Result<Arc<dyn Vendor>, ConfigError> + Send + Sync>;

/// Registry of the product families known to a run
#[derive(Default)]
pub struct ProductRegistry {
    factories: HashMap<&'static str, VendorFactory>,
}

impl ProductRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in family
    pub fn with_default_families() -> Self {
        let mut registry = Self::new();
        registry.register(dummy::FAMILY, |entry| {
            Ok(Arc::new(DummyVendor::from_entry(entry)?) as Arc<dyn Vendor>)
        });
        registry.register(makemkv::FAMILY, |entry| {
            Ok(Arc::new(MakeMkvVendor::from_entry(entry)?) as Arc<dyn Vendor>)
        });
        registry.register(github::FAMILY, |entry| {
            Ok(Arc::new(GitHubVendor::from_entry(entry)?) as Arc<dyn Vendor>)
        });
        registry
    }

    /// Registers a family, replacing any family of the same name
    pub fn register<F>(&mut self, family: &'static str, factory: F)
    where
        F: Fn(&ProductEntry) -> Result<Arc<dyn Vendor>, ConfigError> + Send + Sync + 'static,
    {
        self.factories.insert(family, Arc::new(factory));
    }

    /// Returns the registered family names, sorted
    pub fn families(&self) -> Vec<&'static str> {
        let mut families: Vec<_> = self.factories.keys().copied().collect();
        families.sort_unstable();
        families
    }

    /// Resolves the vendor of a configured product
    ///
    /// # Returns
    /// * `Ok(Arc<dyn Vendor>)` - The vendor built from the product's options
    /// * `Err(ConfigError::UnknownFamily)` - If the family is not registered
    /// * `Err(ConfigError)` - If the family rejects the product's options
    pub fn vendor_for(&self, entry: &ProductEntry) -> Result<Arc<dyn Vendor>, ConfigError> {
        let factory = self
            .factories
            .get(entry.family.as_str())
            .ok_or_else(|| ConfigError::UnknownFamily {
                product: entry.id.clone(),
                family: entry.family.clone(),
            })?;
        factory(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::product::vendor::MockVendor;
    use rstest::rstest;

    fn entry(family: &str, options: &str) -> ProductEntry {
        let config = Config::parse(&format!(
            "[core]\nstore = /srv/store\n[sets]\n[applications]\napp = true\n[app]\nfamily = {}\n{}",
            family, options
        ))
        .unwrap();
        config.products[0].clone()
    }

    #[test]
    fn with_default_families_registers_builtin_families() {
        let registry = ProductRegistry::with_default_families();

        assert_eq!(registry.families(), vec!["dummy", "github", "makemkv"]);
    }

    #[rstest]
    #[case("dummy", "", "dummy")]
    #[case("makemkv", "", "makemkv")]
    #[case("github", "repository = owner/tool\n", "github")]
    fn vendor_for_resolves_family(#[case] family: &str, #[case] options: &str, #[case] expected: &str) {
        let registry = ProductRegistry::with_default_families();

        let vendor = registry.vendor_for(&entry(family, options)).unwrap();

        assert_eq!(vendor.family(), expected);
    }

    #[test]
    fn vendor_for_reports_unknown_family() {
        let registry = ProductRegistry::with_default_families();

        let result = registry.vendor_for(&entry("winget", ""));

        assert!(matches!(
            result,
            Err(ConfigError::UnknownFamily { product, family }) if product == "app" && family == "winget"
        ));
    }

    #[test]
    fn vendor_for_reports_invalid_family_options() {
        let registry = ProductRegistry::with_default_families();

        let result = registry.vendor_for(&entry("github", ""));

        assert!(matches!(result, Err(ConfigError::MissingKey { key, .. }) if key == "repository"));
    }

    #[test]
    fn register_adds_custom_family() {
        let mut registry = ProductRegistry::new();
        registry.register("custom", |_| {
            let mut vendor = MockVendor::new();
            vendor.expect_family().return_const("custom");
            Ok(Arc::new(vendor) as Arc<dyn Vendor>)
        });

        let vendor = registry.vendor_for(&entry("custom", "")).unwrap();

        assert_eq!(vendor.family(), "custom");
        assert_eq!(registry.families(), vec!["custom"]);
    }
}
