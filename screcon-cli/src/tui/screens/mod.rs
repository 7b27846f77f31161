pub mod help;
pub mod newscan;
pub mod scans;
