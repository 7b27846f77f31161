//! CVSS version selection and severity ordering.
//!
//! A CVE entry may carry scores under CVSS 3.1, 3.0 and 2.0 at once. Display
//! always uses exactly one of them, preferring the newest version that has a
//! numeric base score. A block with a vector but no score counts as absent.

use std::cmp::Ordering;
use std::fmt;

use screcon_types::{CveDetails, CvssMetric};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CvssVersion {
    V3_1,
    V3_0,
    V2_0,
}

impl fmt::Display for CvssVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V3_1 => write!(f, "3.1"),
            Self::V3_0 => write!(f, "3.0"),
            Self::V2_0 => write!(f, "2.0"),
        }
    }
}

/// The single severity selected for display. All fields are `None` when no
/// CVSS block has a usable base score.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CvssNormalized {
    pub score: Option<f64>,
    pub version: Option<CvssVersion>,
    pub severity: Option<String>,
    pub vector: Option<String>,
}

fn from_block(metric: &CvssMetric, version: CvssVersion) -> Option<CvssNormalized> {
    metric.base_score.map(|score| CvssNormalized {
        score: Some(score),
        version: Some(version),
        severity: metric.base_severity.clone(),
        vector: metric.vector_string.clone(),
    })
}

/// Select the preferred CVSS block: 3.1, then 3.0, then 2.0.
pub fn normalize_cvss(cve: &CveDetails) -> CvssNormalized {
    let Some(cvss) = cve.cvss.as_ref() else {
        return CvssNormalized::default();
    };

    cvss.v3_1
        .as_ref()
        .and_then(|m| from_block(m, CvssVersion::V3_1))
        .or_else(|| {
            cvss.v3_0
                .as_ref()
                .and_then(|m| from_block(m, CvssVersion::V3_0))
        })
        .or_else(|| {
            cvss.v2_0
                .as_ref()
                .and_then(|m| from_block(m, CvssVersion::V2_0))
        })
        .unwrap_or_default()
}

/// Total order for the CVE table: normalized score descending, unscored
/// entries after all scored ones, ties broken by CVE id ascending.
pub fn cvss_desc_ordering(a: &(String, CveDetails), b: &(String, CveDetails)) -> Ordering {
    let sa = normalize_cvss(&a.1).score;
    let sb = normalize_cvss(&b.1).score;

    match (sa, sb) {
        (None, None) => a.0.cmp(&b.0),
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => y
            .partial_cmp(&x)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0)),
    }
}

/// Sort CVE entries in place by [`cvss_desc_ordering`]. Stable, so sorting
/// twice yields the same order.
pub fn sort_cves_by_cvss_desc(entries: &mut [(String, CveDetails)]) {
    entries.sort_by(cvss_desc_ordering);
}

#[cfg(test)]
mod tests {
    use super::*;
    use screcon_types::CvssBlocks;

    fn cve_with(v3_1: Option<f64>, v3_0: Option<f64>, v2_0: Option<f64>) -> CveDetails {
        CveDetails {
            cvss: Some(CvssBlocks {
                v3_1: v3_1.map(CvssMetric::scored),
                v3_0: v3_0.map(CvssMetric::scored),
                v2_0: v2_0.map(CvssMetric::scored),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn prefers_v3_1_over_older() {
        let n = normalize_cvss(&cve_with(Some(9.8), Some(9.0), Some(7.5)));
        assert_eq!(n.score, Some(9.8));
        assert_eq!(n.version, Some(CvssVersion::V3_1));
    }

    #[test]
    fn falls_back_to_v3_0_then_v2_0() {
        let n = normalize_cvss(&cve_with(None, Some(6.5), Some(7.5)));
        assert_eq!(n.version, Some(CvssVersion::V3_0));

        let n = normalize_cvss(&cve_with(None, None, Some(7.5)));
        assert_eq!(n.score, Some(7.5));
        assert_eq!(n.version, Some(CvssVersion::V2_0));
        assert_eq!(n.version.unwrap().to_string(), "2.0");
    }

    #[test]
    fn block_without_score_is_skipped() {
        // v3.1 block present but scoreless: v2.0 wins
        let cve = CveDetails {
            cvss: Some(CvssBlocks {
                v3_1: Some(CvssMetric {
                    vector_string: Some("CVSS:3.1/AV:N".into()),
                    ..Default::default()
                }),
                v3_0: None,
                v2_0: Some(CvssMetric::scored(4.3)),
            }),
            ..Default::default()
        };
        let n = normalize_cvss(&cve);
        assert_eq!(n.score, Some(4.3));
        assert_eq!(n.version, Some(CvssVersion::V2_0));
    }

    #[test]
    fn no_usable_score_normalizes_to_all_none() {
        assert_eq!(normalize_cvss(&CveDetails::default()), CvssNormalized::default());
        assert_eq!(
            normalize_cvss(&cve_with(None, None, None)),
            CvssNormalized::default()
        );
    }

    #[test]
    fn severity_and_vector_come_from_selected_block() {
        let cve = CveDetails {
            cvss: Some(CvssBlocks {
                v3_1: Some(CvssMetric {
                    base_score: Some(7.5),
                    base_severity: Some("HIGH".into()),
                    vector_string: Some("CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:N/A:N".into()),
                    version: Some("3.1".into()),
                }),
                v3_0: None,
                v2_0: None,
            }),
            ..Default::default()
        };
        let n = normalize_cvss(&cve);
        assert_eq!(n.severity.as_deref(), Some("HIGH"));
        assert!(n.vector.as_deref().unwrap().starts_with("CVSS:3.1/"));
    }

    #[test]
    fn sort_is_descending_with_unscored_last() {
        let mut entries = vec![
            ("CVE-2020-0003".to_string(), cve_with(None, None, None)),
            ("CVE-2020-0002".to_string(), cve_with(Some(5.0), None, None)),
            ("CVE-2020-0001".to_string(), cve_with(Some(9.8), None, None)),
            ("CVE-2020-0004".to_string(), cve_with(None, None, Some(5.0))),
        ];
        sort_cves_by_cvss_desc(&mut entries);

        let ids: Vec<&str> = entries.iter().map(|(id, _)| id.as_str()).collect();
        // equal scores (5.0) tie-break by id; unscored last
        assert_eq!(
            ids,
            vec![
                "CVE-2020-0001",
                "CVE-2020-0002",
                "CVE-2020-0004",
                "CVE-2020-0003"
            ]
        );
    }

    #[test]
    fn sort_is_idempotent() {
        let mut entries = vec![
            ("CVE-2019-0010".to_string(), cve_with(Some(7.5), None, None)),
            ("CVE-2019-0002".to_string(), cve_with(Some(7.5), None, None)),
            ("CVE-2019-0001".to_string(), cve_with(None, None, None)),
            ("CVE-2019-0003".to_string(), cve_with(Some(2.1), None, None)),
        ];
        sort_cves_by_cvss_desc(&mut entries);
        let once: Vec<String> = entries.iter().map(|(id, _)| id.clone()).collect();
        sort_cves_by_cvss_desc(&mut entries);
        let twice: Vec<String> = entries.iter().map(|(id, _)| id.clone()).collect();
        assert_eq!(once, twice);
    }
}
