//! MakeMKV family, described by the vendor's PAD document

use std::path::Path;

use chrono::NaiveDate;
use tracing::debug;

use crate::config::{ConfigError, ProductEntry};
use crate::product::error::ProductError;
use crate::product::pad::PadDocument;
use crate::product::types::{InstallerProfile, Target, UpdateCandidate};
use crate::product::vendor::{Vendor, read_artifact};

pub const FAMILY: &str = "makemkv";

const NAME: &str = "MakeMKV";
const PAD_URL: &str = "http://www.makemkv.com/makemkv.xml";
const RELEASE_NOTE_URL: &str = "http://www.makemkv.com/download/";
const SILENT_ARGS: &str = "/S";

const VERSION_PATH: &str = "Program_Info/Program_Version";
const YEAR_PATH: &str = "Program_Info/Program_Release_Year";
const MONTH_PATH: &str = "Program_Info/Program_Release_Month";
const DAY_PATH: &str = "Program_Info/Program_Release_Day";
const DOWNLOAD_PATH: &str = "Web_Info/Download_URLs/Primary_Download_URL";
const FILE_SIZE_PATH: &str = "Program_Info/File_Info/File_Size_Bytes";

pub struct MakeMkvVendor {
    pad_url: String,
}

impl MakeMkvVendor {
    pub fn new(pad_url: &str) -> Self {
        Self {
            pad_url: pad_url.to_string(),
        }
    }

    pub fn from_entry(entry: &ProductEntry) -> Result<Self, ConfigError> {
        Ok(Self::new(entry.option("catalog_url").unwrap_or(PAD_URL)))
    }
}

impl Default for MakeMkvVendor {
    fn default() -> Self {
        Self::new(PAD_URL)
    }
}

/// Release date from the PAD year/month/day fields, as `YYYY-MM-DD`
fn release_date(document: &PadDocument) -> Option<String> {
    let year = document.text(YEAR_PATH)?.parse().ok()?;
    let month = document.text(MONTH_PATH)?.parse().ok()?;
    let day = document.text(DAY_PATH)?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format("%Y-%m-%d").to_string())
}

impl Vendor for MakeMkvVendor {
    fn family(&self) -> &'static str {
        FAMILY
    }

    fn display_name(&self) -> String {
        NAME.to_string()
    }

    fn metadata_location(&self) -> String {
        self.pad_url.clone()
    }

    fn parse_metadata(&self, artifact: &Path) -> Result<UpdateCandidate, ProductError> {
        let content = read_artifact(artifact)?;
        let document = PadDocument::parse(&content).ok_or_else(|| {
            ProductError::MetadataMalformed("not a PAD document".to_string())
        })?;

        let version = document.text(VERSION_PATH).ok_or_else(|| {
            ProductError::MetadataMalformed(format!("missing {}", VERSION_PATH))
        })?;
        let location = document.text(DOWNLOAD_PATH).ok_or_else(|| {
            ProductError::MetadataMalformed(format!("missing {}", DOWNLOAD_PATH))
        })?;
        let published = release_date(&document);
        if published.is_none() {
            debug!("PAD document of {} has no valid release date", NAME);
        }

        let file_size = document
            .text(FILE_SIZE_PATH)
            .and_then(|size| size.parse::<u64>().ok());

        Ok(UpdateCandidate {
            version,
            published,
            location: Some(location),
            file_size,
            ..UpdateCandidate::default()
        })
    }

    fn installer_profile(&self, _candidate: &UpdateCandidate) -> InstallerProfile {
        InstallerProfile {
            target: Some(Target::Unified),
            std_inst_args: Some(String::new()),
            silent_inst_args: Some(SILENT_ARGS.to_string()),
            release_note: Some(RELEASE_NOTE_URL.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn pad(version: &str, month: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"<?xml version="1.0" encoding="UTF-8" ?>
<XML_DIZ_INFO>
  <Program_Info>
    <Program_Name>MakeMKV</Program_Name>
    <Program_Version>{version}</Program_Version>
    <Program_Release_Month>{month}</Program_Release_Month>
    <Program_Release_Day>05</Program_Release_Day>
    <Program_Release_Year>2024</Program_Release_Year>
    <File_Info>
      <File_Size_Bytes>17302528</File_Size_Bytes>
    </File_Info>
  </Program_Info>
  <Web_Info>
    <Download_URLs>
      <Primary_Download_URL>http://www.makemkv.com/download/Setup_MakeMKV_v{version}.exe</Primary_Download_URL>
    </Download_URLs>
  </Web_Info>
</XML_DIZ_INFO>
"#
        )
        .unwrap();
        file
    }

    #[rstest]
    #[case("02", Some("2024-02-05"))]
    #[case("13", None)]
    #[case("", None)]
    fn parse_metadata_returns_expected(#[case] month: &str, #[case] published: Option<&str>) {
        let file = pad("1.17.6", month);

        let candidate = MakeMkvVendor::default().parse_metadata(file.path()).unwrap();

        assert_eq!(candidate.version, "1.17.6");
        assert_eq!(candidate.published.as_deref(), published);
        assert_eq!(
            candidate.location.as_deref(),
            Some("http://www.makemkv.com/download/Setup_MakeMKV_v1.17.6.exe")
        );
        assert_eq!(candidate.file_size, Some(17_302_528));
        assert_eq!(candidate.secure_hash, None);
    }

    #[test]
    fn parse_metadata_rejects_non_pad_document() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"<html>Service unavailable</html>").unwrap();

        let result = MakeMkvVendor::default().parse_metadata(file.path());

        assert!(matches!(result, Err(ProductError::MetadataMalformed(_))));
    }

    #[test]
    fn parse_metadata_requires_version() {
        let file = pad("", "02");

        let result = MakeMkvVendor::default().parse_metadata(file.path());

        assert!(matches!(result, Err(ProductError::MetadataMalformed(_))));
    }

    #[test]
    fn installer_profile_carries_vendor_defaults() {
        let profile = MakeMkvVendor::default().installer_profile(&UpdateCandidate::default());

        assert_eq!(profile.target, Some(Target::Unified));
        assert_eq!(profile.silent_inst_args.as_deref(), Some("/S"));
        assert_eq!(profile.release_note.as_deref(), Some(RELEASE_NOTE_URL));
    }
}
