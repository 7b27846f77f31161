//! Fixed-arity record parsers for the backend's flat result strings.
//!
//! Wire format: a single comma-separated list, grouped positionally into
//! records of N fields. A record whose every field is empty after trimming
//! is skipped; a truncated trailing record is padded with empty fields and
//! gets the same treatment. Absent input parses to an empty list.

const NA: &str = "n/a";

/// One bannergrab record: port, service, product, version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BannerRow {
    pub port: Option<u32>,
    pub service: String,
    pub product: String,
    pub version: String,
}

/// One portscan record: port, service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortService {
    pub port: Option<u32>,
    pub service: String,
}

/// One SMB share record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmbShareRow {
    pub name: String,
    pub share_type: String,
    pub comment: String,
    pub path: String,
    pub anonymous_access: String,
}

/// One subdomain-enumeration record: path, HTTP status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubdomainRow {
    pub path: String,
    pub status: String,
}

/// Split `input` on commas, trim each field, and group into records of
/// `arity` fields. Missing trailing fields become empty strings. Records
/// whose every field is empty are dropped.
fn records(input: &str, arity: usize) -> Vec<Vec<&str>> {
    let fields: Vec<&str> = input.split(',').map(str::trim).collect();

    let mut out = Vec::new();
    let mut i = 0;
    while i < fields.len() {
        let record: Vec<&str> = (0..arity)
            .map(|j| fields.get(i + j).copied().unwrap_or(""))
            .collect();
        if record.iter().any(|f| !f.is_empty()) {
            out.push(record);
        }
        i += arity;
    }
    out
}

/// Ports parse leniently: anything that is not a decimal number becomes
/// `None` rather than a parse failure.
fn parse_port(raw: &str) -> Option<u32> {
    raw.parse().ok()
}

fn or_na(raw: &str) -> String {
    if raw.is_empty() { NA.into() } else { raw.into() }
}

/// Parse a bannergrab result string into rows sorted ascending by port,
/// rows without a numeric port last.
pub fn parse_banner_grab(input: Option<&str>) -> Vec<BannerRow> {
    let Some(input) = input else {
        return Vec::new();
    };

    let mut rows: Vec<BannerRow> = records(input, 4)
        .into_iter()
        .map(|r| BannerRow {
            port: parse_port(r[0]),
            service: r[1].into(),
            product: r[2].into(),
            version: r[3].into(),
        })
        .collect();

    rows.sort_by_key(|r| r.port.unwrap_or(u32::MAX));
    rows
}

/// Parse a portscan result string into (port, service) rows sorted
/// ascending by port, rows without a numeric port last. Empty services
/// render as `"n/a"`.
pub fn parse_port_services(input: Option<&str>) -> Vec<PortService> {
    let Some(input) = input else {
        return Vec::new();
    };

    let mut rows: Vec<PortService> = records(input, 2)
        .into_iter()
        .map(|r| PortService {
            port: parse_port(r[0]),
            service: or_na(r[1]),
        })
        .collect();

    rows.sort_by_key(|r| r.port.unwrap_or(u32::MAX));
    rows
}

/// Parse an SMB shares result string. Every empty field defaults to
/// `"n/a"`; a result of exactly one row with all five fields `"n/a"` is the
/// backend's way of reporting no data and collapses to an empty list.
pub fn parse_smb_shares(input: Option<&str>) -> Vec<SmbShareRow> {
    let Some(input) = input else {
        return Vec::new();
    };

    let rows: Vec<SmbShareRow> = records(input, 5)
        .into_iter()
        .map(|r| SmbShareRow {
            name: or_na(r[0]),
            share_type: or_na(r[1]),
            comment: or_na(r[2]),
            path: or_na(r[3]),
            anonymous_access: or_na(r[4]),
        })
        .collect();

    if rows.len() == 1 {
        let only = &rows[0];
        if [
            &only.name,
            &only.share_type,
            &only.comment,
            &only.path,
            &only.anonymous_access,
        ]
        .iter()
        .all(|f| f.as_str() == NA)
        {
            return Vec::new();
        }
    }

    rows
}

/// Parse a subdomain-enumeration result string into (path, status) rows in
/// input order. Empty fields default to `"n/a"`.
pub fn parse_subdomains(input: Option<&str>) -> Vec<SubdomainRow> {
    let Some(input) = input else {
        return Vec::new();
    };

    records(input, 2)
        .into_iter()
        .map(|r| SubdomainRow {
            path: or_na(r[0]),
            status: or_na(r[1]),
        })
        .collect()
}
