use std::cmp::Ordering;

use semver::Version;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareResult {
    /// Current version is the latest
    Latest,
    /// A newer version is available
    Outdated,
    /// Current version is newer than the candidate
    Newer,
    /// One of the versions cannot be ordered
    Invalid,
}

/// Parse a version string into a semver::Version, normalizing partial versions.
///
/// Handles partial versions like "1" or "1.2" by padding with zeros.
/// Does NOT strip 'v' prefix (use `normalize_version` first if needed).
///
/// Examples:
/// - "1" -> Version(1, 0, 0)
/// - "1.2" -> Version(1, 2, 0)
/// - "1.2.3" -> Version(1, 2, 3)
pub fn parse_version(version: &str) -> Option<Version> {
    let parts: Vec<&str> = version.split('.').collect();
    let normalized = match parts.len() {
        1 => format!("{}.0.0", parts[0]),
        2 => format!("{}.{}.0", parts[0], parts[1]),
        _ => version.to_string(),
    };
    Version::parse(&normalized).ok()
}

/// Strip a leading 'v' or 'V' as used by release tags ("v1.2.3").
pub fn normalize_version(version: &str) -> &str {
    let version = version.trim();
    version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version)
}

/// Dotted numeric components, used for versions semver rejects ("32.0.0.171").
fn numeric_components(version: &str) -> Option<Vec<u64>> {
    version
        .split('.')
        .map(|part| part.parse::<u64>().ok())
        .collect()
}

fn compare_numeric(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let x = a.get(i).copied().unwrap_or(0);
            let y = b.get(i).copied().unwrap_or(0);
            x.cmp(&y)
        })
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Order two version strings.
///
/// Returns `None` when either version cannot be ordered.
pub fn order_versions(a: &str, b: &str) -> Option<Ordering> {
    let a = normalize_version(a);
    let b = normalize_version(b);

    if let (Some(x), Some(y)) = (parse_version(a), parse_version(b)) {
        return Some(x.cmp(&y));
    }

    let x = numeric_components(a)?;
    let y = numeric_components(b)?;
    Some(compare_numeric(&x, &y))
}

/// Whether a version string can be ordered at all
pub fn is_valid_version(version: &str) -> bool {
    order_versions(version, version).is_some()
}

/// Compare the recorded version of a product with a candidate version.
pub fn compare_versions(current: &str, candidate: &str) -> CompareResult {
    match order_versions(current, candidate) {
        Some(Ordering::Less) => CompareResult::Outdated,
        Some(Ordering::Equal) => CompareResult::Latest,
        Some(Ordering::Greater) => CompareResult::Newer,
        None => CompareResult::Invalid,
    }
}
