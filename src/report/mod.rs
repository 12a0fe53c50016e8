//! Publishing of the per-test HTML reports produced by the runtime.
//!
//! The runtime writes one `<test case>.html` per test into the build's report
//! directory. A [`ReportPublisher`] receives one [`ReportDescriptor`] per report;
//! the default [`ManifestPublisher`] records them in a `reports.json` manifest and
//! an `index.html` page next to the reports.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::error::{Error, Result};

/// Display name prefix of every published report.
pub const REPORT_TITLE_PREFIX: &str = "Spirent iTest Report";

/// Manifest file written by [`ManifestPublisher`].
pub const MANIFEST_FILE: &str = "reports.json";

/// Index page written by [`ManifestPublisher`].
pub const INDEX_FILE: &str = "index.html";

/// One published HTML report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReportDescriptor {
    /// Link title.
    pub title: String,
    /// Directory holding the report.
    pub directory: PathBuf,
    /// Report file name inside `directory`.
    pub file: String,
    /// Keep reports of past builds.
    pub keep_all: bool,
    /// Publish even if the build failed.
    pub always_show: bool,
}

impl ReportDescriptor {
    /// Descriptor for the report of `test_case` in `directory`.
    pub fn for_test_case(test_case: &str, directory: &Path) -> Self {
        Self {
            title: format!("{REPORT_TITLE_PREFIX}-{test_case}"),
            directory: directory.to_path_buf(),
            file: format!("{test_case}.html"),
            keep_all: true,
            always_show: true,
        }
    }

    /// Full path of the report file.
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.file)
    }
}

/// One descriptor per test case name, in order.
pub fn descriptors(test_case_names: &[String], directory: &Path) -> Vec<ReportDescriptor> {
    test_case_names
        .iter()
        .map(|name| ReportDescriptor::for_test_case(name, directory))
        .collect()
}

/// Receives the reports of a finished run.
pub trait ReportPublisher {
    /// Publish all reports. An error fails the build.
    fn publish(&self, reports: &[ReportDescriptor]) -> Result<()>;

    /// Get a human-readable name for this publisher.
    fn name(&self) -> &str;
}

/// Writes `reports.json` and `index.html` into each report directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManifestPublisher;

impl ManifestPublisher {
    pub fn new() -> Self {
        Self
    }

    fn publish_dir(&self, dir: &Path, reports: &[&ReportDescriptor]) -> Result<()> {
        if !dir.is_dir() {
            return Err(Error::report(format!(
                "report directory does not exist: {}",
                dir.display()
            )));
        }

        for report in reports {
            if !report.path().exists() {
                log::warn!("report not generated: {}", report.path().display());
            }
        }

        let manifest = serde_json::to_string_pretty(reports)?;
        std::fs::write(dir.join(MANIFEST_FILE), manifest)
            .map_err(|e| Error::report(format!("cannot write {}: {}", MANIFEST_FILE, e)))?;

        std::fs::write(dir.join(INDEX_FILE), render_index(reports))
            .map_err(|e| Error::report(format!("cannot write {}: {}", INDEX_FILE, e)))?;

        log::info!("published {} report(s) in {}", reports.len(), dir.display());
        Ok(())
    }
}

impl ReportPublisher for ManifestPublisher {
    fn publish(&self, reports: &[ReportDescriptor]) -> Result<()> {
        let mut by_dir: BTreeMap<&Path, Vec<&ReportDescriptor>> = BTreeMap::new();
        for report in reports {
            by_dir.entry(report.directory.as_path()).or_default().push(report);
        }
        for (dir, reports) in by_dir {
            self.publish_dir(dir, &reports)?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "manifest"
    }
}

fn render_index(reports: &[&ReportDescriptor]) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html><html><head><meta charset=\"utf-8\">");
    html.push_str(&format!("<title>{}</title></head><body>", REPORT_TITLE_PREFIX));
    html.push_str(&format!("<h1>{}</h1><ul>", REPORT_TITLE_PREFIX));
    for report in reports {
        let status = if report.path().exists() { "" } else { " (missing)" };
        html.push_str(&format!(
            "<li><a href=\"{}\">{}</a>{}</li>",
            escape_html(&report.file),
            escape_html(&report.title),
            status
        ));
    }
    html.push_str("</ul></body></html>\n");
    html
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
