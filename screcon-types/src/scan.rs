use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cve::{CveDetails, MetamoduleResult};

/// One scan session as returned by `GET /scans`.
///
/// The backend creates the session first and attaches a result blob per
/// phase as each phase completes, so every blob is optional. The frontend
/// never mutates a scan in place; it re-fetches the whole collection after
/// any mutating call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scan {
    pub scan_id: i64,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub timing: i64,
    /// ISO-8601 creation timestamp. Kept as a string; lexicographic order
    /// matches chronological order, which is all the list view needs.
    #[serde(default)]
    pub created_at: String,

    #[serde(default)]
    pub portscan: Option<PhaseResult>,
    #[serde(default)]
    pub bannergrab: Option<PhaseResult>,
    #[serde(default)]
    pub vulnerabilityscan: Option<VulnScanResult>,
    #[serde(default)]
    pub subdomainl1: Option<SubdomainResult>,
    #[serde(default)]
    pub smbshares: Option<PhaseResult>,
    #[serde(default)]
    pub whatweb: Option<WhatWebReport>,
    #[serde(default)]
    pub cves: Option<CveLookup>,
    #[serde(default)]
    pub metamodules: Option<MetamoduleLookup>,
}

impl Scan {
    /// Number of CVEs attached to this scan (0 when the lookup never ran).
    pub fn cve_count(&self) -> usize {
        self.cves.as_ref().map_or(0, |c| c.cves.len())
    }

    pub fn portscan_raw(&self) -> Option<&str> {
        self.portscan.as_ref().and_then(|p| p.scan_result.as_deref())
    }

    pub fn bannergrab_raw(&self) -> Option<&str> {
        self.bannergrab
            .as_ref()
            .and_then(|p| p.scan_result.as_deref())
    }

    pub fn smbshares_raw(&self) -> Option<&str> {
        self.smbshares
            .as_ref()
            .and_then(|p| p.scan_result.as_deref())
    }

    pub fn subdomains_raw(&self) -> Option<&str> {
        self.subdomainl1
            .as_ref()
            .and_then(|s| s.subdomains.as_deref())
    }
}

/// Generic phase blob carrying a flat comma-delimited result string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhaseResult {
    #[serde(default)]
    pub scan_result: Option<String>,
    #[serde(default)]
    pub scan_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VulnScanResult {
    #[serde(default)]
    pub vulnerabilities: Option<String>,
    #[serde(default)]
    pub scan_id: Option<i64>,
}

/// Subdomain enumeration blob. The backend emits the flat list under the
/// literal key `"subdomains:"` (trailing colon included); preserved verbatim
/// for wire compatibility.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubdomainResult {
    #[serde(default, rename = "subdomains:")]
    pub subdomains: Option<String>,
    #[serde(default)]
    pub scan_id: Option<i64>,
}

/// WhatWeb fingerprinting report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WhatWebReport {
    #[serde(default)]
    pub report_for: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub summary_plugins: Vec<SummaryPlugin>,
    #[serde(default)]
    pub detected_plugins: BTreeMap<String, Value>,
    #[serde(default)]
    pub http_headers: BTreeMap<String, Value>,
    #[serde(default)]
    pub scan_id: Option<i64>,
}

impl WhatWebReport {
    /// True when every field the panel renders is absent or empty.
    pub fn is_empty(&self) -> bool {
        self.report_for.is_none()
            && self.status.is_none()
            && self.title.is_none()
            && self.ip.is_none()
            && self.country.is_none()
            && self.summary_plugins.is_empty()
            && self.detected_plugins.is_empty()
            && self.http_headers.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryPlugin {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub summary_values: Vec<String>,
}

/// CVE lookup blob: CVE id → details.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CveLookup {
    #[serde(default)]
    pub cves: BTreeMap<String, CveDetails>,
    #[serde(default)]
    pub scan_id: Option<i64>,
}

/// Metasploit module lookup blob: CVE id → matching modules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetamoduleLookup {
    #[serde(default)]
    pub results: BTreeMap<String, Vec<MetamoduleResult>>,
    #[serde(default)]
    pub scan_id: Option<i64>,
}

impl MetamoduleLookup {
    pub fn modules_for(&self, cve_id: &str) -> &[MetamoduleResult] {
        self.results.get(cve_id).map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_scan_with_partial_phases() {
        let json = r#"{
            "scan_id": 7,
            "ip": "192.168.1.10",
            "timing": 5,
            "created_at": "2025-11-03T14:22:10",
            "portscan": {"scan_result": "22,ssh,80,http", "scan_id": 7},
            "vulnerabilityscan": {"vulnerabilities": "CVE-2021-41773", "scan_id": 7}
        }"#;

        let scan: Scan = serde_json::from_str(json).unwrap();
        assert_eq!(scan.scan_id, 7);
        assert_eq!(scan.ip, "192.168.1.10");
        assert_eq!(scan.portscan_raw(), Some("22,ssh,80,http"));
        assert!(scan.bannergrab.is_none());
        assert_eq!(
            scan.vulnerabilityscan.unwrap().vulnerabilities.as_deref(),
            Some("CVE-2021-41773")
        );
    }

    #[test]
    fn parse_subdomains_colon_key() {
        let json = r#"{"subdomains:": "admin,200,login,301", "scan_id": 3}"#;
        let blob: SubdomainResult = serde_json::from_str(json).unwrap();
        assert_eq!(blob.subdomains.as_deref(), Some("admin,200,login,301"));
    }

    #[test]
    fn scan_tolerates_unknown_fields() {
        let json = r#"{"scan_id": 1, "ip": "10.0.0.1", "some_future_field": {"x": 1}}"#;
        let scan: Scan = serde_json::from_str(json).unwrap();
        assert_eq!(scan.scan_id, 1);
        assert_eq!(scan.cve_count(), 0);
    }

    #[test]
    fn whatweb_emptiness() {
        let empty = WhatWebReport::default();
        assert!(empty.is_empty());

        let with_title = WhatWebReport {
            title: Some("Apache2 Debian Default Page".into()),
            ..Default::default()
        };
        assert!(!with_title.is_empty());
    }
}
