//! Run context shared by every pipe in a publish run.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::artifact::Artifacts;

/// Cancellation flag for one run. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Everything a publish run shares across pipes and worker threads.
///
/// The context is read-only for the duration of a publish call; hosts build
/// it up front and hand out shared references.
#[derive(Debug, Clone)]
pub struct Context {
    pub project: String,
    pub version: String,
    /// Environment snapshot consulted for credential resolution and
    /// `{env.KEY}` template lookups.
    pub env: BTreeMap<String, String>,
    /// Upper bound on concurrently running upload tasks per target.
    pub parallelism: usize,
    /// Set by the host to turn the whole publish phase into a skip.
    pub skip_publish: bool,
    pub artifacts: Artifacts,
    /// Archive-level name replacements applied to os/arch when resolving
    /// binary-mode target templates.
    pub replacements: BTreeMap<String, String>,
    pub cancel: CancelToken,
}

impl Context {
    pub fn new(project: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            version: version.into(),
            env: BTreeMap::new(),
            parallelism: 4,
            skip_publish: false,
            artifacts: Artifacts::new(),
            replacements: BTreeMap::new(),
            cancel: CancelToken::new(),
        }
    }

    /// Like [`Context::new`], with the process environment captured into the
    /// env map.
    pub fn from_env(project: impl Into<String>, version: impl Into<String>) -> Self {
        let mut ctx = Self::new(project, version);
        ctx.env = std::env::vars().collect();
        ctx
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new("", "")
    }
}
