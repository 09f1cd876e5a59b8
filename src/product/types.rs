//! Common types for products

use std::fmt;

/// Target architecture of an installer (the Windows one)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// Works only on 32 bits architecture
    X86,
    /// Works only on 64 bits architecture
    X64,
    /// Works on both architectures
    Unified,
}

impl Target {
    /// Returns the string representation of the target
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::X86 => "x86",
            Target::X64 => "x64",
            Target::Unified => "unified",
        }
    }
}

impl std::str::FromStr for Target {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "x86" => Ok(Target::X86),
            "x64" => Ok(Target::X64),
            "unified" => Ok(Target::Unified),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A newer release found while checking a product.
///
/// Produced by the metadata parser of a family, held as the pending update
/// of a record until it is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateCandidate {
    pub version: String,
    /// Publication date (ISO 8601)
    pub published: Option<String>,
    /// Download location of the installer
    pub location: Option<String>,
    pub release_note: Option<String>,
    /// Installer size in bytes, as announced by the vendor
    pub file_size: Option<u64>,
    /// Installer digest as `<algorithm>:<hex>`, carried but not verified
    pub secure_hash: Option<String>,
}

/// Descriptive fields a family fills in once the installer is downloaded
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InstallerProfile {
    pub target: Option<Target>,
    pub std_inst_args: Option<String>,
    pub silent_inst_args: Option<String>,
    /// Used when the candidate does not carry a release note
    pub release_note: Option<String>,
}

/// Last known state of a product, keyed by its configuration id
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductRecord {
    pub id: String,
    pub name: String,
    pub target: Option<Target>,
    pub version: Option<String>,
    pub published: Option<String>,
    /// Local path of the installer
    pub installer: Option<String>,
    pub std_inst_args: Option<String>,
    pub silent_inst_args: Option<String>,
    pub release_note: Option<String>,
    pub file_size: Option<u64>,
    pub secure_hash: Option<String>,
    /// Pending update; `None` means no update is available
    pub update: Option<UpdateCandidate>,
}

impl ProductRecord {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn update_available(&self) -> bool {
        self.update.is_some()
    }

    /// Current version, if one was ever recorded
    pub fn current_version(&self) -> Option<&str> {
        self.version.as_deref().filter(|v| !v.trim().is_empty())
    }

    /// Replace the current-install fields with the fetched candidate and
    /// clear the pending update.
    pub fn apply_update(
        &mut self,
        candidate: UpdateCandidate,
        installer: String,
        profile: InstallerProfile,
    ) {
        self.version = Some(candidate.version);
        self.published = candidate.published;
        self.installer = Some(installer);
        self.target = profile.target;
        self.std_inst_args = profile.std_inst_args;
        self.silent_inst_args = profile.silent_inst_args;
        self.release_note = candidate.release_note.or(profile.release_note);
        self.file_size = candidate.file_size;
        self.secure_hash = candidate.secure_hash;
        self.update = None;
    }
}
