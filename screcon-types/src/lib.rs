pub mod cve;
pub mod scan;

pub use cve::{CveDetails, CvssBlocks, CvssMetric, MetamoduleResult};
pub use scan::{
    CveLookup, MetamoduleLookup, PhaseResult, Scan, SubdomainResult, SummaryPlugin, VulnScanResult,
    WhatWebReport,
};
