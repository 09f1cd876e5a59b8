//! Minimal reader for PAD (Portable Application Description) documents
//!
//! PAD files are flat XML documents rooted at `XML_DIZ_INFO`. Only element
//! text lookup by path is needed, so the reader works on the raw text.
//! An element nested in an element of the same name is not supported: the
//! outer body ends at the first closing tag. Among siblings of the same name
//! the first one is selected.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use regex::Regex;

const PAD_ROOT: &str = "XML_DIZ_INFO";

/// A PAD document held in memory
pub struct PadDocument {
    content: String,
}

impl PadDocument {
    /// Wraps the text of a PAD document
    ///
    /// # Returns
    /// * `Some(PadDocument)` - If the text has a `XML_DIZ_INFO` root element
    /// * `None` - Otherwise
    pub fn parse(content: &str) -> Option<Self> {
        let root = element_body(content, PAD_ROOT)?;
        Some(Self {
            content: root.to_string(),
        })
    }

    /// Returns the trimmed text of the element at `path` (`/` separated, relative
    /// to the root), or `None` when it is missing or empty
    pub fn text(&self, path: &str) -> Option<String> {
        let mut scope = self.content.as_str();
        for tag in path.split('/').filter(|t| !t.is_empty()) {
            scope = element_body(scope, tag)?;
        }
        let text = unescape(scope.trim());
        if text.is_empty() { None } else { Some(text) }
    }
}

/// Compiled element patterns, by tag name
static TAG_PATTERNS: OnceLock<Mutex<HashMap<String, Regex>>> = OnceLock::new();

fn tag_pattern(tag: &str) -> Option<Regex> {
    let mut patterns = TAG_PATTERNS.get_or_init(Default::default).lock().ok()?;
    if let Some(re) = patterns.get(tag) {
        return Some(re.clone());
    }
    let pattern = format!(r"(?s)<{0}(?:\s[^>]*)?>(.*?)</{0}\s*>", regex::escape(tag));
    let re = Regex::new(&pattern).ok()?;
    patterns.insert(tag.to_string(), re.clone());
    Some(re)
}

fn element_body<'a>(content: &'a str, tag: &str) -> Option<&'a str> {
    tag_pattern(tag)?
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn unescape(text: &str) -> String {
    let text = text
        .strip_prefix("<![CDATA[")
        .and_then(|t| t.strip_suffix("]]>"))
        .unwrap_or(text);
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<XML_DIZ_INFO>
  <Program_Info>
    <Program_Name>MakeMKV</Program_Name>
    <Program_Version>1.17.6</Program_Version>
    <Program_Release_Year>2024</Program_Release_Year>
    <Program_Description></Program_Description>
  </Program_Info>
  <Web_Info>
    <Download_URLs>
      <Primary_Download_URL>http://example.com/setup.exe?a=1&amp;b=2</Primary_Download_URL>
    </Download_URLs>
  </Web_Info>
</XML_DIZ_INFO>
"#;

    #[rstest]
    #[case("Program_Info/Program_Version", Some("1.17.6"))]
    #[case("Program_Info/Program_Release_Year", Some("2024"))]
    #[case(
        "Web_Info/Download_URLs/Primary_Download_URL",
        Some("http://example.com/setup.exe?a=1&b=2")
    )]
    #[case("Program_Info/Program_Description", None)]
    #[case("Program_Info/Program_Release_Month", None)]
    #[case("Web_Info/Program_Version", None)]
    fn text_returns_expected(#[case] path: &str, #[case] expected: Option<&str>) {
        let document = PadDocument::parse(DOCUMENT).unwrap();

        assert_eq!(document.text(path).as_deref(), expected);
    }

    #[rstest]
    #[case("<html><body>Not a PAD file</body></html>")]
    #[case("")]
    fn parse_rejects_documents_without_pad_root(#[case] content: &str) {
        assert!(PadDocument::parse(content).is_none());
    }

    #[test]
    fn text_compiles_each_tag_once() {
        let document = PadDocument::parse(DOCUMENT).unwrap();
        document.text("Program_Info/Program_Version");
        let before = tag_pattern("Program_Version").unwrap();

        document.text("Program_Info/Program_Version");

        let patterns = TAG_PATTERNS.get().unwrap().lock().unwrap();
        assert!(patterns.contains_key(PAD_ROOT));
        assert!(patterns.contains_key("Program_Info"));
        assert_eq!(patterns["Program_Version"].as_str(), before.as_str());
    }

    #[test]
    fn text_selects_first_sibling_of_the_same_name() {
        let document = PadDocument::parse(
            "<XML_DIZ_INFO><Download_URLs><URL>http://a/setup.exe</URL><URL>http://b/setup.exe</URL></Download_URLs></XML_DIZ_INFO>",
        )
        .unwrap();

        assert_eq!(
            document.text("Download_URLs/URL").as_deref(),
            Some("http://a/setup.exe")
        );
    }

    #[test]
    fn text_strips_cdata() {
        let document = PadDocument::parse(
            "<XML_DIZ_INFO><Program_Info><Program_Name><![CDATA[Make & MKV]]></Program_Name></Program_Info></XML_DIZ_INFO>",
        )
        .unwrap();

        assert_eq!(
            document.text("Program_Info/Program_Name").as_deref(),
            Some("Make & MKV")
        );
    }
}
