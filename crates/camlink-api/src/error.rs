use thiserror::Error;

/// Top-level error type for the `camlink-api` crate.
///
/// Every network failure is classified before it leaves this crate so the
/// caller can pick a policy per failure class: a timeout may mean the device
/// acted on the request, a refused connection means it never saw it.
/// `camlink-core` maps these into session-level errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// No route to the device: connection refused, DNS failure, reset
    /// before a response arrived.
    #[error("Device unreachable at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    /// The request did not complete within its bound.
    #[error("{route} timed out after {timeout_ms}ms")]
    Timeout { route: String, timeout_ms: u64 },

    // ── Device responses ────────────────────────────────────────────
    /// The device answered with a non-success status.
    #[error("{route} rejected by device (HTTP {status})")]
    Rejected {
        route: String,
        status: u16,
        body: String,
    },

    /// The device answered but the body could not be understood.
    #[error("{route} returned an unreadable body: {message}")]
    Malformed {
        route: String,
        message: String,
        body: String,
    },

    // ── Addressing ──────────────────────────────────────────────────
    /// The supplied host identifier is not a usable device address.
    #[error("Invalid device address '{input}': {reason}")]
    InvalidAddress { input: String, reason: String },

    /// URL construction failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The underlying HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

/// Coarse failure classes a caller bases its retry policy on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Unreachable,
    Timeout,
    Rejected,
    Malformed,
    /// Local misuse (bad address, client construction); not a device fault.
    Local,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Unreachable => "unreachable",
            Self::Timeout => "timeout",
            Self::Rejected => "rejected",
            Self::Malformed => "malformed",
            Self::Local => "local",
        })
    }
}

impl Error {
    /// Collapse this error onto the failure taxonomy.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Unreachable { .. } => FailureKind::Unreachable,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Rejected { .. } => FailureKind::Rejected,
            Self::Malformed { .. } => FailureKind::Malformed,
            Self::InvalidAddress { .. } | Self::InvalidUrl(_) | Self::ClientBuild(_) => {
                FailureKind::Local
            }
        }
    }

    /// Returns `true` if a caller-driven retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::Timeout { .. })
    }

    /// Returns `true` when the device may have acted on the request even
    /// though no acknowledgement arrived.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// HTTP status returned by the device, if it got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classify a `reqwest` failure raised while sending a request or
    /// reading its body.
    pub(crate) fn from_reqwest(err: &reqwest::Error, route: &str, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            return Self::Timeout {
                route: route.to_owned(),
                timeout_ms,
            };
        }

        let url = err
            .url()
            .map_or_else(|| "<unknown>".to_owned(), ToString::to_string);

        Self::Unreachable {
            url,
            reason: root_cause(err),
        }
    }
}

/// Walk the source chain so "connection refused" surfaces instead of the
/// generic "error sending request" wrapper.
fn root_cause(err: &reqwest::Error) -> String {
    let mut current: &dyn std::error::Error = err;
    while let Some(next) = current.source() {
        current = next;
    }
    current.to_string()
}
