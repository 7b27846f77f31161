use serde::{Deserialize, Serialize};

/// One CVE entry from the backend's CVE lookup, keyed externally by CVE id.
///
/// Up to three CVSS blocks may be present; which one is authoritative for
/// display is decided by the normalizer in `screcon-parse`, never here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CveDetails {
    #[serde(default, rename = "cveId")]
    pub cve_id: Option<String>,
    #[serde(default)]
    pub description_en: Option<String>,
    #[serde(default)]
    pub cvss: Option<CvssBlocks>,
}

/// The alternative CVSS scorings the CVE database may carry for one CVE.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CvssBlocks {
    #[serde(default, rename = "cvssV3_1")]
    pub v3_1: Option<CvssMetric>,
    #[serde(default, rename = "cvssV3_0")]
    pub v3_0: Option<CvssMetric>,
    #[serde(default, rename = "cvssV2_0")]
    pub v2_0: Option<CvssMetric>,
}

/// A single CVSS scoring block. `base_score` is the presence test used by
/// the normalizer: a block without a numeric score counts as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CvssMetric {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, rename = "baseScore")]
    pub base_score: Option<f64>,
    #[serde(default, rename = "baseSeverity")]
    pub base_severity: Option<String>,
    #[serde(default, rename = "vectorString")]
    pub vector_string: Option<String>,
}

impl CvssMetric {
    pub fn scored(score: f64) -> Self {
        Self {
            base_score: Some(score),
            ..Default::default()
        }
    }
}

/// One Metasploit module matched against a CVE.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetamoduleResult {
    #[serde(default)]
    pub module_name: String,
    #[serde(default)]
    pub module_type: String,
    #[serde(default)]
    pub module_refname: String,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub disclosure_date: Option<String>,
    #[serde(default)]
    pub search_fullname: Option<String>,
    #[serde(default)]
    pub search_refname: Option<String>,
    #[serde(default)]
    pub search_path: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub loaded_fullname: Option<String>,
}

impl MetamoduleResult {
    /// Display name for the module list: prefer the human name, fall back
    /// to the refname, then a placeholder.
    pub fn display_name(&self) -> &str {
        if !self.module_name.is_empty() {
            &self.module_name
        } else if !self.module_refname.is_empty() {
            &self.module_refname
        } else {
            "Module"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cve_details() {
        let json = r#"{
            "cveId": "CVE-2021-41773",
            "description_en": "Path traversal in Apache HTTP Server 2.4.49.",
            "cvss": {
                "cvssV3_1": {
                    "version": "3.1",
                    "baseScore": 7.5,
                    "baseSeverity": "HIGH",
                    "vectorString": "CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:N/A:N"
                }
            }
        }"#;

        let cve: CveDetails = serde_json::from_str(json).unwrap();
        assert_eq!(cve.cve_id.as_deref(), Some("CVE-2021-41773"));
        let v31 = cve.cvss.unwrap().v3_1.unwrap();
        assert_eq!(v31.base_score, Some(7.5));
        assert_eq!(v31.base_severity.as_deref(), Some("HIGH"));
    }

    #[test]
    fn cvss_block_without_score() {
        // A block may carry a vector but no score; deserialization keeps it,
        // the normalizer treats it as absent.
        let json = r#"{"version": "3.0", "vectorString": "AV:N/AC:M/Au:N/C:P/I:P/A:P"}"#;
        let metric: CvssMetric = serde_json::from_str(json).unwrap();
        assert!(metric.base_score.is_none());
        assert!(metric.vector_string.is_some());
    }

    #[test]
    fn metamodule_display_name_fallbacks() {
        let named = MetamoduleResult {
            module_name: "Apache Normalize Path RCE".into(),
            module_refname: "exploit/multi/http/apache_normalize_path_rce".into(),
            ..Default::default()
        };
        assert_eq!(named.display_name(), "Apache Normalize Path RCE");

        let ref_only = MetamoduleResult {
            module_refname: "exploit/multi/http/apache_normalize_path_rce".into(),
            ..Default::default()
        };
        assert_eq!(
            ref_only.display_name(),
            "exploit/multi/http/apache_normalize_path_rce"
        );

        assert_eq!(MetamoduleResult::default().display_name(), "Module");
    }
}
