//! Parsing and normalization of backend scan payloads.
//!
//! The backend delivers phase results as flat comma-delimited strings with a
//! fixed field count per logical record, and CVE entries scored under up to
//! three CVSS versions. Everything in this crate is pure: parsers never
//! fail (malformed fields degrade to `None` / `"n/a"`), and the CVSS
//! ordering is derived entirely from the records themselves.

pub mod cvss;
pub mod fields;

pub use cvss::{CvssNormalized, CvssVersion, cvss_desc_ordering, normalize_cvss, sort_cves_by_cvss_desc};
pub use fields::{
    BannerRow, PortService, SmbShareRow, SubdomainRow, parse_banner_grab, parse_port_services,
    parse_smb_shares, parse_subdomains,
};
