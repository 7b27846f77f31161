// ---------------------------------------------------------------------------
// Multi-phase scan orchestration
// ---------------------------------------------------------------------------
//
// Phases run strictly sequentially against the backend: later phases consume
// artifacts the earlier ones attach to the scan session. The user picks a
// subset; prerequisites are force-included by a pure closure function, and
// the CVE / module lookups are skipped when the vulnerability scan came back
// empty.

use std::collections::BTreeSet;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use screcon_client::{ApiClient, ClientError};

/// One backend scan or lookup phase. Declaration order is the fixed
/// execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Portscan,
    Bannergrab,
    Vulnscan,
    Cves,
    Metamodules,
    Subenum,
    SmbShares,
    Whatweb,
}

impl Phase {
    /// Execution order: lookups right after the vulnerability scan, the
    /// independent enumerations last.
    pub const ORDER: [Phase; 8] = [
        Phase::Portscan,
        Phase::Bannergrab,
        Phase::Vulnscan,
        Phase::Cves,
        Phase::Metamodules,
        Phase::Subenum,
        Phase::SmbShares,
        Phase::Whatweb,
    ];

    /// Presentation order for the selection checkboxes.
    pub const CHOICES: [Phase; 8] = [
        Phase::Portscan,
        Phase::Bannergrab,
        Phase::Vulnscan,
        Phase::Cves,
        Phase::Metamodules,
        Phase::Whatweb,
        Phase::Subenum,
        Phase::SmbShares,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Portscan => "Port scan",
            Self::Bannergrab => "Banner grab",
            Self::Vulnscan => "Vulnerability scan",
            Self::Cves => "CVE lookup",
            Self::Metamodules => "Metasploit module lookup",
            Self::Subenum => "Subdomain enumeration",
            Self::SmbShares => "SMB shares",
            Self::Whatweb => "WhatWeb",
        }
    }
}

/// Expand a phase selection with its prerequisites:
/// banner grab and vulnerability scan need the port scan, and the lookups
/// need the vulnerability scan (and thus the port scan). Idempotent.
pub fn expand_selection(selected: &BTreeSet<Phase>) -> BTreeSet<Phase> {
    let mut out = selected.clone();

    if out.contains(&Phase::Bannergrab) || out.contains(&Phase::Vulnscan) {
        out.insert(Phase::Portscan);
    }

    if out.contains(&Phase::Cves) || out.contains(&Phase::Metamodules) {
        out.insert(Phase::Vulnscan);
        out.insert(Phase::Portscan);
    }

    out
}

/// Whether `phase` is force-included by the rest of the selection, i.e. its
/// checkbox must render locked.
pub fn is_locked(expanded: &BTreeSet<Phase>, phase: Phase) -> bool {
    match phase {
        Phase::Portscan => {
            expanded.contains(&Phase::Bannergrab)
                || expanded.contains(&Phase::Vulnscan)
                || expanded.contains(&Phase::Cves)
                || expanded.contains(&Phase::Metamodules)
        }
        Phase::Vulnscan => {
            expanded.contains(&Phase::Cves) || expanded.contains(&Phase::Metamodules)
        }
        _ => false,
    }
}

/// The preset offered for a new scan.
pub fn default_selection() -> BTreeSet<Phase> {
    BTreeSet::from([
        Phase::Portscan,
        Phase::Vulnscan,
        Phase::Cves,
        Phase::Metamodules,
    ])
}

/// Expanded selection in execution order.
pub fn plan(selected: &BTreeSet<Phase>) -> Vec<Phase> {
    let expanded = expand_selection(selected);
    Phase::ORDER
        .iter()
        .copied()
        .filter(|p| expanded.contains(p))
        .collect()
}

/// Parameters for one orchestration run.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub ip: String,
    pub timing: u8,
    pub phases: BTreeSet<Phase>,
}

/// Event emitted while an orchestration run progresses. Consumers derive a
/// percentage as `completed / total`.
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// Run accepted; `total` counts session creation plus each planned phase.
    Started { total: usize },
    /// A step is about to execute (or be skipped).
    StepStarted { label: &'static str },
    /// Append-only human-readable progress line.
    Log(String),
    /// A step finished or was counted as done by the skip rule.
    StepDone { completed: usize, total: usize },
    /// Every planned step completed.
    Completed { scan_id: i64 },
    /// A step failed; the remaining sequence was aborted. Already-completed
    /// phases stay committed on the backend.
    Failed(String),
}

pub struct Orchestrator;

impl Orchestrator {
    /// Run the full sequence, streaming [`RunEvent`]s. Events are sent
    /// best-effort so a dropped receiver never wedges the run.
    ///
    /// Cancellation aborts between or inside steps without emitting
    /// [`RunEvent::Failed`]; whatever the backend already executed persists.
    pub async fn run_streaming(
        client: &ApiClient,
        request: &ScanRequest,
        tx: mpsc::Sender<RunEvent>,
        cancel: CancellationToken,
    ) {
        match Self::drive(client, request, &tx, &cancel).await {
            Ok(Some(scan_id)) => {
                info!(scan_id, ip = %request.ip, "scan run completed");
                let _ = tx.send(RunEvent::Completed { scan_id }).await;
            }
            Ok(None) => {
                info!(ip = %request.ip, "scan run cancelled");
                let _ = tx.send(RunEvent::Log("Scan cancelled.".into())).await;
            }
            Err(e) => {
                warn!(error = %e, ip = %request.ip, "scan run failed");
                let _ = tx.send(RunEvent::Failed(e.to_string())).await;
            }
        }
    }

    /// `Ok(Some(id))` on completion, `Ok(None)` on cancellation.
    async fn drive(
        client: &ApiClient,
        request: &ScanRequest,
        tx: &mpsc::Sender<RunEvent>,
        cancel: &CancellationToken,
    ) -> Result<Option<i64>, ClientError> {
        let phases = plan(&request.phases);
        let total = phases.len() + 1;
        let mut completed = 0usize;

        let _ = tx.send(RunEvent::Started { total }).await;

        let send_log = |line: String| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(RunEvent::Log(line)).await;
            }
        };

        let _ = tx
            .send(RunEvent::StepStarted {
                label: "Create scan session",
            })
            .await;
        send_log("Creating scan session...".into()).await;
        let scan_id = match client
            .create_scan_session(&request.ip, request.timing, cancel)
            .await
        {
            Ok(id) => id,
            Err(ClientError::Cancelled) => return Ok(None),
            Err(e) => return Err(e),
        };
        send_log(format!("Created scan_id {scan_id}")).await;
        completed += 1;
        let _ = tx.send(RunEvent::StepDone { completed, total }).await;

        // Flipped to false when the vulnerability scan finds nothing, which
        // short-circuits the dependent lookups.
        let mut vuln_found = true;

        for phase in phases {
            let _ = tx
                .send(RunEvent::StepStarted {
                    label: phase.label(),
                })
                .await;

            let outcome = match phase {
                Phase::Portscan => {
                    send_log("Running port scan...".into()).await;
                    client
                        .run_portscan(scan_id, cancel)
                        .await
                        .map(|_| "Port scan done.")
                }
                Phase::Bannergrab => {
                    send_log("Running banner grab...".into()).await;
                    client
                        .run_bannergrab(scan_id, cancel)
                        .await
                        .map(|_| "Banner grab done.")
                }
                Phase::Vulnscan => {
                    send_log("Running vulnerability scan... (this can take 5 - 15 minutes)".into())
                        .await;
                    match client.run_vulnscan(scan_id, cancel).await {
                        Ok(result) => {
                            vuln_found = has_vulnerabilities(&result);
                            if !vuln_found {
                                send_log("No vulnerabilities found.".into()).await;
                            }
                            Ok("Vulnerability scan done.")
                        }
                        Err(e) => Err(e),
                    }
                }
                Phase::Cves if !vuln_found => {
                    send_log("Skipping CVE lookup (no vulnerabilities).".into()).await;
                    Ok("")
                }
                Phase::Cves => {
                    send_log("Looking up CVEs...".into()).await;
                    client
                        .lookup_cves(scan_id, cancel)
                        .await
                        .map(|_| "CVE lookup done.")
                }
                Phase::Metamodules if !vuln_found => {
                    send_log("Skipping Metasploit module lookup (no vulnerabilities).".into())
                        .await;
                    Ok("")
                }
                Phase::Metamodules => {
                    send_log("Looking up Metasploit modules...".into()).await;
                    client
                        .lookup_metamodules(scan_id, cancel)
                        .await
                        .map(|_| "Metasploit module lookup done.")
                }
                Phase::Subenum => {
                    send_log("Running subdomain enumeration...".into()).await;
                    client
                        .run_subenum(scan_id, cancel)
                        .await
                        .map(|_| "Subdomain enumeration done.")
                }
                Phase::SmbShares => {
                    send_log("Checking SMB shares...".into()).await;
                    client
                        .run_smbshares(scan_id, cancel)
                        .await
                        .map(|_| "SMB shares done.")
                }
                Phase::Whatweb => {
                    send_log("Running WhatWeb...".into()).await;
                    client
                        .run_whatweb(scan_id, cancel)
                        .await
                        .map(|_| "WhatWeb done.")
                }
            };

            match outcome {
                Ok(line) => {
                    if !line.is_empty() {
                        send_log(line.into()).await;
                    }
                }
                Err(ClientError::Cancelled) => return Ok(None),
                Err(e) => return Err(e),
            }

            completed += 1;
            let _ = tx.send(RunEvent::StepDone { completed, total }).await;
        }

        send_log("All selected scans completed.".into()).await;
        Ok(Some(scan_id))
    }
}

/// Probe a vulnerability-scan response for non-empty vulnerabilities text.
///
/// The backend has answered with the text at the top level and nested under
/// `vulnerabilityscan` at different times; both locations are probed in
/// priority order rather than collapsed.
fn has_vulnerabilities(result: &Value) -> bool {
    let text = result
        .get("vulnerabilities")
        .and_then(Value::as_str)
        .or_else(|| {
            result
                .get("vulnerabilityscan")
                .and_then(|v| v.get("vulnerabilities"))
                .and_then(Value::as_str)
        })
        .unwrap_or("");

    !text.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expand_is_a_closure_over_lookups() {
        let expanded = expand_selection(&BTreeSet::from([Phase::Cves]));
        assert!(expanded.contains(&Phase::Cves));
        assert!(expanded.contains(&Phase::Vulnscan));
        assert!(expanded.contains(&Phase::Portscan));
        assert_eq!(expanded.len(), 3);
    }

    #[test]
    fn expand_adds_portscan_for_bannergrab() {
        let expanded = expand_selection(&BTreeSet::from([Phase::Bannergrab]));
        assert_eq!(
            expanded,
            BTreeSet::from([Phase::Bannergrab, Phase::Portscan])
        );
    }

    #[test]
    fn expand_leaves_independent_phases_alone() {
        let sel = BTreeSet::from([Phase::Whatweb, Phase::SmbShares, Phase::Subenum]);
        assert_eq!(expand_selection(&sel), sel);
    }

    #[test]
    fn expand_is_idempotent() {
        for phase in Phase::ORDER {
            let once = expand_selection(&BTreeSet::from([phase]));
            assert_eq!(expand_selection(&once), once, "{phase:?}");
        }
        let all = expand_selection(&Phase::ORDER.into_iter().collect());
        assert_eq!(expand_selection(&all), all);
    }

    #[test]
    fn plan_follows_fixed_execution_order() {
        let phases = plan(&BTreeSet::from([Phase::Whatweb, Phase::Cves]));
        assert_eq!(
            phases,
            vec![
                Phase::Portscan,
                Phase::Vulnscan,
                Phase::Cves,
                Phase::Whatweb
            ]
        );
    }

    #[test]
    fn locked_checkboxes_track_dependents() {
        let expanded = expand_selection(&BTreeSet::from([Phase::Metamodules]));
        assert!(is_locked(&expanded, Phase::Portscan));
        assert!(is_locked(&expanded, Phase::Vulnscan));
        assert!(!is_locked(&expanded, Phase::Whatweb));

        let banner_only = expand_selection(&BTreeSet::from([Phase::Bannergrab]));
        assert!(is_locked(&banner_only, Phase::Portscan));
        assert!(!is_locked(&banner_only, Phase::Vulnscan));
    }

    #[test]
    fn default_selection_expands_to_itself() {
        let sel = default_selection();
        assert_eq!(expand_selection(&sel), sel);
    }

    #[test]
    fn vulnerabilities_probe_checks_both_shapes() {
        assert!(has_vulnerabilities(&json!({"vulnerabilities": "CVE-2021-41773"})));
        assert!(has_vulnerabilities(
            &json!({"vulnerabilityscan": {"vulnerabilities": "CVE-2021-41773"}})
        ));
        assert!(!has_vulnerabilities(&json!({"vulnerabilities": "  "})));
        assert!(!has_vulnerabilities(&json!({"vulnerabilityscan": {}})));
        assert!(!has_vulnerabilities(&json!({})));
        // non-string shapes degrade to "no vulnerabilities"
        assert!(!has_vulnerabilities(&json!({"vulnerabilities": 3})));
    }
}
