//! Outcome of a run, reported to the operator

use std::fmt;
use std::path::PathBuf;

use crate::export::ExportReport;

/// Run policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Check every enabled product and record pending updates
    CheckOnly,
    /// Fetch the pending updates already on record, without checking
    FetchOnly,
    /// Check, fetch what was found, then export
    Full,
    /// Rebuild the applist files from the catalog
    ExportOnly,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::CheckOnly => "check-only",
            Mode::FetchOnly => "fetch-only",
            Mode::Full => "full",
            Mode::ExportOnly => "export-only",
        }
    }

    pub fn checks(&self) -> bool {
        matches!(self, Mode::CheckOnly | Mode::Full)
    }

    pub fn fetches(&self) -> bool {
        matches!(self, Mode::FetchOnly | Mode::Full)
    }

    pub fn exports(&self) -> bool {
        matches!(self, Mode::Full | Mode::ExportOnly)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one product during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Disabled in the configuration, left untouched
    Disabled,
    UpToDate { version: Option<String> },
    /// A newer version was recorded as pending
    UpdateFound {
        version: String,
        published: Option<String>,
    },
    Fetched { version: String, installer: PathBuf },
    NothingToFetch,
    /// The product kept its prior record
    Failed { error: String },
    /// Export-only runs leave products alone
    Skipped,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Disabled => write!(f, "disabled"),
            Outcome::UpToDate { version: Some(v) } => write!(f, "up to date ({})", v),
            Outcome::UpToDate { version: None } => write!(f, "up to date"),
            Outcome::UpdateFound {
                version,
                published,
            } => match published {
                Some(date) => write!(f, "update {} published on {}", version, date),
                None => write!(f, "update {} found", version),
            },
            Outcome::Fetched { version, installer } => {
                write!(f, "fetched {} -> {}", version, installer.display())
            }
            Outcome::NothingToFetch => write!(f, "nothing to fetch"),
            Outcome::Failed { error } => write!(f, "FAILED: {}", error),
            Outcome::Skipped => write!(f, "not processed"),
        }
    }
}

/// Report of a whole run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub mode: Mode,
    /// Per-product outcomes, in configuration order
    pub outcomes: Vec<(String, Outcome)>,
    pub export: Option<ExportReport>,
}

impl RunSummary {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            outcomes: Vec::new(),
            export: None,
        }
    }

    pub fn outcome(&self, product: &str) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| id == product)
            .map(|(_, outcome)| outcome)
    }

    /// Number of products whose cycle failed
    pub fn failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, Outcome::Failed { .. }))
            .count()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "appdownload {} run", self.mode)?;
        for (id, outcome) in &self.outcomes {
            writeln!(f, "  {:<20} {}", id, outcome)?;
        }
        if let Some(report) = &self.export {
            writeln!(
                f,
                "  {} applist line(s) written to {} file(s)",
                report.lines,
                report.files.len()
            )?;
            for skipped in &report.skipped {
                writeln!(f, "  skipped in applist: {} ({})", skipped.product, skipped.reason)?;
            }
        }
        if self.failures() > 0 {
            writeln!(f, "  {} product(s) failed", self.failures())?;
        }
        Ok(())
    }
}
