//! # Hoist
//!
//! A publishing layer that ships release artifacts to HTTP servers.
//!
//! Hoist takes the artifacts of a release — archives, binaries, linux
//! packages, checksums, signatures — and uploads them to configured HTTP
//! destinations with bounded concurrency and strict credential hygiene.
//!
//! ## Features
//!
//! - **Declarative destinations** — Upload targets are plain config structs;
//!   every target is validated before a single byte moves, and a
//!   misconfigured section skips the pipe with a precise reason.
//! - **Template expansion** — Destination URLs expand `{project}`,
//!   `{version}`, `{artifact}`, `{os}`, `{arch}`, and `{env.KEY}` per
//!   artifact, with `{{`/`}}` escapes for literal braces.
//! - **Bounded fan-out** — Targets publish sequentially; within a target,
//!   artifacts upload through a counting gate capped by the context's
//!   parallelism. The first error wins, and queued uploads still drain.
//! - **Credential hygiene** — Usernames come from config or
//!   `<KIND>_<NAME>_USERNAME`; secrets come from `<KIND>_<NAME>_SECRET`
//!   only, never from persisted configuration. Error messages carry the
//!   kind, instance, method, URL, and status — never the secret.
//! - **Pluggable seams** — Target resolution, extra headers, response
//!   validation, and asset opening are all injectable closures, so pipes
//!   with richer protocols build on the same engine.
//! - **Artifactory support** — A deploy-endpoint pipe that forces PUT,
//!   decodes the deployment document, and surfaces API error envelopes.
//!
//! ## Pipeline
//!
//! The core flow is **validate → select → fan out → check**:
//!
//! 1. [`transfer::check_target`] validates each target up front: destination,
//!    name, mode, credentials, and trust bundle.
//! 2. [`transfer::build_filter`] selects the artifacts a target wants by
//!    mode, checksum/signature flags, and id allow-list.
//! 3. [`Uploader::publish`](transfer::Uploader::publish) fans the selection
//!    out per target, bounded by [`Context::parallelism`](context::Context).
//! 4. A response checker validates every reply; the default accepts 2xx.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use hoist::{context::Context, pipe::upload, report::StderrReporter, transfer::UploadTarget};
//!
//! let ctx = Context::from_env("myapp", "1.2.3");
//! let mut targets = vec![UploadTarget {
//!     name: "cdn".to_string(),
//!     target: "https://cdn.example.com/{project}/{version}".to_string(),
//!     username: "deploy".to_string(),
//!     ..UploadTarget::default()
//! }];
//! upload::apply_defaults(&mut targets);
//! upload::publish(&ctx, &targets, Arc::new(StderrReporter))?;
//! ```
//!
//! ## Key Types
//!
//! - `UploadTarget` — One configured destination (URL template, mode, flags)
//! - `Uploader` — The engine: validation, selection, fan-out, transfer
//! - `Artifact` / `Artifacts` — Release outputs and their filter combinators
//! - `Context` — Shared run state: env snapshot, parallelism, cancellation
//! - `Skip` — Typed pipe skip, distinguishable from hard failures
//!
//! ## Modules
//!
//! - [`artifact`] — Artifact catalog, kinds, checksums, filter combinators
//! - [`context`] — Run context shared by every pipe
//! - [`pipe`] — Publishing pipes ([`pipe::upload`], [`pipe::artifactory`])
//!   and skip signaling
//! - [`report`] — Progress reporting seam
//! - [`semgroup`] — Bounded-concurrency task group
//! - [`tmpl`] — Destination URL template expansion
//! - [`transfer`] — The upload engine and its pluggable seams

/// Artifact catalog, kinds, checksums, filter combinators.
pub mod artifact;

/// Run context shared by every pipe.
pub mod context;

/// Publishing pipes and skip signaling.
pub mod pipe;

/// Progress reporting seam.
pub mod report;

/// Bounded-concurrency task group.
/// Re-exported from hoist-semgroup microcrate.
pub use hoist_semgroup as semgroup;

/// Destination URL template expansion.
pub mod tmpl;

/// The upload engine and its pluggable seams.
pub mod transfer;
