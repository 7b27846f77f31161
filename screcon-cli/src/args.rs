use clap::Parser;

/// Command-line arguments for the screcon dashboard.
#[derive(Parser, Debug)]
#[command(
    name = "screcon",
    version,
    about = "Browse scans and run multi-phase scans against the SCRecon backend"
)]
pub struct Args {
    /// Backend API base URL
    #[arg(long = "backend-url", value_name = "URL", default_value = screcon_client::DEFAULT_BASE_URL)]
    pub backend_url: String,

    /// Timing template (0-5) applied to new scan sessions
    #[arg(short = 'T', long = "timing", value_name = "0-5", default_value_t = 5, value_parser = clap::value_parser!(u8).range(0..=5))]
    pub timing: u8,

    /// Increase verbosity level (use -v or -vv)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print the scan list to stdout and exit instead of starting the TUI
    #[arg(long = "no-tui")]
    pub no_tui: bool,
}
