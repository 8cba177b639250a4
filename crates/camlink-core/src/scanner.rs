// ── Network discovery ──
//
// Sequential probing of candidate addresses. Candidates are tried strictly
// in priority order and the first valid `camera-info` answer wins: one
// request in flight at a time keeps the local network quiet and makes the
// result depend on priority, not on which device answers fastest.

use std::collections::HashSet;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use camlink_api::{DeviceAddress, DeviceClient, DeviceInfo, FailureKind};

use crate::error::CoreError;

/// Outcome of probing one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Found,
    Failed { kind: FailureKind, reason: String },
}

/// One probed candidate, in the order it was tried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanAttempt {
    pub address: DeviceAddress,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

/// A successful scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanHit {
    pub address: DeviceAddress,
    pub info: DeviceInfo,
    /// Every candidate tried, including the winning one (last).
    pub attempts: Vec<ScanAttempt>,
}

/// Sequential device prober.
#[derive(Debug, Clone)]
pub struct Scanner {
    client: DeviceClient,
    per_attempt_timeout: Duration,
}

impl Scanner {
    pub fn new(client: DeviceClient, per_attempt_timeout: Duration) -> Self {
        Self {
            client,
            per_attempt_timeout,
        }
    }

    /// Probe `candidates` in order and return the first that answers.
    ///
    /// Unreachable, timed-out, rejecting or malformed candidates are
    /// recorded and skipped. Only exhausting the list is an error.
    pub async fn scan(&self, candidates: &[DeviceAddress]) -> Result<ScanHit, CoreError> {
        let mut attempts = Vec::with_capacity(candidates.len());

        for address in candidates {
            debug!(%address, "probing candidate");
            match self
                .client
                .fetch_info(address, self.per_attempt_timeout)
                .await
            {
                Ok(info) => {
                    info!(%address, model = %info.model, tried = attempts.len() + 1, "camera found");
                    attempts.push(ScanAttempt {
                        address: address.clone(),
                        outcome: AttemptOutcome::Found,
                    });
                    return Ok(ScanHit {
                        address: address.clone(),
                        info,
                        attempts,
                    });
                }
                Err(e) => {
                    debug!(%address, kind = %e.kind(), error = %e, "candidate skipped");
                    attempts.push(ScanAttempt {
                        address: address.clone(),
                        outcome: AttemptOutcome::Failed {
                            kind: e.kind(),
                            reason: e.to_string(),
                        },
                    });
                }
            }
        }

        info!(tried = attempts.len(), "scan exhausted all candidates");
        Err(CoreError::NoDeviceFound { attempts })
    }
}

/// Default candidate order: factory address, then previously-seen
/// addresses, then subnet defaults. Duplicates keep their first position.
pub fn candidate_list(
    factory: &DeviceAddress,
    known: &[DeviceAddress],
    subnet_defaults: &[DeviceAddress],
) -> Vec<DeviceAddress> {
    let mut seen = HashSet::new();
    std::iter::once(factory)
        .chain(known)
        .chain(subnet_defaults)
        .filter(|addr| seen.insert(*addr))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn addr(s: &str) -> DeviceAddress {
        DeviceAddress::parse(s).unwrap()
    }

    #[test]
    fn candidates_follow_priority() {
        let list = candidate_list(
            &addr("192.168.42.1"),
            &[addr("10.0.0.20"), addr("10.0.0.21")],
            &[addr("192.168.1.1")],
        );
        assert_eq!(
            list,
            vec![
                addr("192.168.42.1"),
                addr("10.0.0.20"),
                addr("10.0.0.21"),
                addr("192.168.1.1"),
            ]
        );
    }

    #[test]
    fn duplicates_keep_first_position() {
        let list = candidate_list(
            &addr("192.168.42.1"),
            &[addr("192.168.1.1"), addr("192.168.42.1")],
            &[addr("192.168.1.1"), addr("192.168.0.1")],
        );
        assert_eq!(
            list,
            vec![addr("192.168.42.1"), addr("192.168.1.1"), addr("192.168.0.1")]
        );
    }
}
