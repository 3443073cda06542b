use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::probe::Probe;
use crate::types::{AliveEntry, Candidate, ProbeOutcome, RefreshResult};

/// Probe every candidate with at most `concurrency` probes in flight.
///
/// - Limits concurrent probes using a `Semaphore`; a permit is taken before a
///   task is spawned and held until its probe completes.
/// - Consumes outcomes in completion order from a `JoinSet`; this loop is the
///   only writer of the returned `RefreshResult`.
/// - Alive outcomes are re-validated against the submitted `(host, port)`
///   set; unmatched ones are dropped and counted in `discarded`.
/// - Returns only after every spawned probe has finished.
pub async fn run<P: Probe>(
    candidates: &[Candidate],
    probe: Arc<P>,
    concurrency: usize,
) -> RefreshResult {
    let mut known: Known<'_> = HashMap::new();
    for c in candidates {
        known
            .entry(c.host.as_str())
            .or_default()
            .insert(c.port.as_str());
    }

    let sem = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut set = JoinSet::new();
    let mut pending: HashMap<Id, Candidate> = HashMap::new();
    let mut result = RefreshResult {
        submitted: candidates.len(),
        ..RefreshResult::default()
    };

    for candidate in candidates {
        // Draining here keeps the aggregation running while later
        // candidates are still waiting for a permit.
        while let Some(joined) = set.try_join_next_with_id() {
            absorb(&mut result, &known, &mut pending, joined);
        }

        let permit = sem
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore in scope");
        let probe = Arc::clone(&probe);
        let task_candidate = candidate.clone();
        let handle = set.spawn(async move {
            let _permit = permit; // keep permit until the probe completes
            probe.probe(&task_candidate).await
        });
        pending.insert(handle.id(), candidate.clone());
    }

    while let Some(joined) = set.join_next_with_id().await {
        absorb(&mut result, &known, &mut pending, joined);
    }

    debug!(
        submitted = result.submitted,
        alive = result.alive.len(),
        errors = result.errors.len(),
        discarded = result.discarded,
        "dispatch finished"
    );
    result
}

/// Submitted ports keyed by host.
type Known<'a> = HashMap<&'a str, HashSet<&'a str>>;

fn absorb(
    result: &mut RefreshResult,
    known: &Known<'_>,
    pending: &mut HashMap<Id, Candidate>,
    joined: Result<(Id, ProbeOutcome), JoinError>,
) {
    let outcome = match joined {
        Ok((id, o)) => {
            pending.remove(&id);
            o
        }
        Err(e) => {
            let msg = match pending.remove(&e.id()) {
                Some(c) => format!("Error checking {c}: probe task failed: {e}"),
                None => format!("Probe task failed: {e}"),
            };
            error!("{msg}");
            result.errors.push(msg);
            return;
        }
    };

    match outcome {
        ProbeOutcome::Alive {
            host,
            port,
            country_code,
            org_name,
        } => {
            let submitted = known
                .get(host.as_str())
                .is_some_and(|ports| ports.contains(port.as_str()));
            if !submitted {
                debug!(%host, %port, "alive outcome matches no submitted candidate; discarded");
                result.discarded += 1;
                return;
            }
            info!("{host}:{port} is ALIVE");
            result.alive.push(AliveEntry {
                host,
                port,
                country_code,
                org_name,
            });
        }
        other => {
            if let Some(msg) = other.error_message() {
                warn!("{msg}");
                result.errors.push(msg);
            }
        }
    }
}
