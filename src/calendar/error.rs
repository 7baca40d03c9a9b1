use std::time::Duration;

/// Why a month could not be extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The page or the calendar table did not show up in time.
    Timeout,
    /// The fetched document has no calendar table at all.
    StructuralMismatch,
    Unexpected,
}

/// Errors that end an extraction attempt. The previous partition stays in place.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason:?}: {detail}")]
pub struct ExtractionFailure {
    pub reason: FailureReason,
    pub detail: String,
}

impl ExtractionFailure {
    pub fn timeout(stage: &str, after: Duration) -> Self {
        Self {
            reason: FailureReason::Timeout,
            detail: format!("{stage} not ready after {:.1}s", after.as_secs_f64()),
        }
    }

    pub fn structural(marker: &str) -> Self {
        Self {
            reason: FailureReason::StructuralMismatch,
            detail: format!("no element matches '{marker}'"),
        }
    }

    pub fn unexpected(detail: impl Into<String>) -> Self {
        Self {
            reason: FailureReason::Unexpected,
            detail: detail.into(),
        }
    }

    pub(crate) fn with_cause(mut self, cause: &anyhow::Error) -> Self {
        self.detail = format!("{}: {cause:#}", self.detail);
        self
    }
}

impl From<anyhow::Error> for ExtractionFailure {
    fn from(e: anyhow::Error) -> Self {
        Self::unexpected(format!("{e:#}"))
    }
}

impl From<ureq::Error> for ExtractionFailure {
    fn from(e: ureq::Error) -> Self {
        let timed_out = match &e {
            ureq::Error::Transport(transport) => std::error::Error::source(transport)
                .and_then(|source| source.downcast_ref::<std::io::Error>())
                .is_some_and(|io| io.kind() == std::io::ErrorKind::TimedOut),
            ureq::Error::Status(..) => false,
        };

        Self {
            reason: if timed_out {
                FailureReason::Timeout
            } else {
                FailureReason::Unexpected
            },
            detail: e.to_string(),
        }
    }
}

impl From<std::io::Error> for ExtractionFailure {
    fn from(e: std::io::Error) -> Self {
        let reason = match e.kind() {
            std::io::ErrorKind::TimedOut => FailureReason::Timeout,
            _ => FailureReason::Unexpected,
        };

        Self {
            reason,
            detail: e.to_string(),
        }
    }
}
