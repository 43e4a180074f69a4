//! Generic HTTP upload pipe.

use std::sync::Arc;

use anyhow::Result;

use crate::context::Context;
use crate::pipe;
use crate::report::Reporter;
use crate::transfer::{self, UploadTarget, Uploader};

/// Kind tag: names this pipe in errors, logs, and env var lookups.
pub const KIND: &str = "upload";

/// Fills unset fields: mode defaults to `archive`, method to `PUT`.
pub fn apply_defaults(targets: &mut [UploadTarget]) {
    for target in targets {
        if target.mode.is_empty() {
            target.mode = transfer::MODE_ARCHIVE.to_string();
        }
        if target.method.is_empty() {
            target.method = "PUT".to_string();
        }
    }
}

/// Publishes every configured target with the default 2xx response policy.
///
/// Every target is validated before the first upload starts, so one
/// misconfigured destination skips the pipe without any network activity.
pub fn publish(ctx: &Context, targets: &[UploadTarget], reporter: Arc<dyn Reporter>) -> Result<()> {
    if targets.is_empty() {
        return Err(pipe::skip("uploads section is not configured"));
    }
    for target in targets {
        transfer::check_target(ctx, target, KIND)?;
    }
    Uploader::new(KIND, reporter).publish(ctx, targets)
}
