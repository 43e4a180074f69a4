//! Integration pipes and the skip signal they share.
//!
//! A pipe is a kind-scoped entry point over the transfer engine: it applies
//! configuration defaults, validates every target, then publishes. Pipes
//! that have nothing valid to do return a [`Skip`] instead of failing the
//! run.

pub mod artifactory;
pub mod upload;

use thiserror::Error;

/// Non-fatal signal: this pipe has nothing valid to do for this run.
///
/// Skips travel through `?` like ordinary errors; run drivers classify them
/// with [`is_skip`] and carry on with the rest of the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct Skip {
    reason: String,
}

impl Skip {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Builds a skip already wrapped in `anyhow::Error`, ready for `return Err`.
pub fn skip(reason: impl Into<String>) -> anyhow::Error {
    anyhow::Error::new(Skip::new(reason))
}

/// The distinguished skip raised when the run context disables publishing.
pub fn publish_disabled() -> anyhow::Error {
    skip("publishing is disabled")
}

/// True when `err` carries a [`Skip`] anywhere in its chain.
pub fn is_skip(err: &anyhow::Error) -> bool {
    err.downcast_ref::<Skip>().is_some()
}

#[cfg(test)]
mod tests {
    use anyhow::{Context as _, anyhow};

    use super::*;

    #[test]
    fn skip_displays_its_reason() {
        let err = skip("upload section 'cdn' is not configured properly (missing target)");
        assert_eq!(
            err.to_string(),
            "upload section 'cdn' is not configured properly (missing target)"
        );
        assert!(is_skip(&err));
    }

    #[test]
    fn ordinary_errors_are_not_skips() {
        let err = anyhow!("connection reset");
        assert!(!is_skip(&err));
    }

    #[test]
    fn skip_survives_added_context() {
        let err = Err::<(), _>(skip("nothing to do"))
            .context("publishing artifacts")
            .unwrap_err();
        assert!(is_skip(&err));
    }

    #[test]
    fn publish_disabled_is_a_skip() {
        let err = publish_disabled();
        assert!(is_skip(&err));
        assert_eq!(err.to_string(), "publishing is disabled");
    }
}
