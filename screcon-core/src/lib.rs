pub mod orchestrator;

pub use orchestrator::{
    Orchestrator, Phase, RunEvent, ScanRequest, default_selection, expand_selection, is_locked,
    plan,
};
pub use tokio_util::sync::CancellationToken;
