//! Event reporting for publish runs.

/// Sink for human-readable publish events.
///
/// Upload workers report from multiple threads, so implementations take
/// `&self` and must be shareable.
pub trait Reporter: Send + Sync {
    fn debug(&self, msg: &str);
    fn info(&self, msg: &str);
    fn warn(&self, msg: &str);
    fn error(&self, msg: &str);
}

/// Reporter writing `[level] message` lines to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrReporter;

impl Reporter for StderrReporter {
    fn debug(&self, msg: &str) {
        eprintln!("[debug] {msg}");
    }

    fn info(&self, msg: &str) {
        eprintln!("[info] {msg}");
    }

    fn warn(&self, msg: &str) {
        eprintln!("[warn] {msg}");
    }

    fn error(&self, msg: &str) {
        eprintln!("[error] {msg}");
    }
}
