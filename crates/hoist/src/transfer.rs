//! HTTP transfer engine shared by the upload pipes.
//!
//! The engine validates upload targets, selects matching artifacts, and fans
//! them out to authenticated HTTP requests under a bounded concurrency
//! group. Integration-specific behavior (URL resolution, extra headers,
//! response validation, asset opening) is injected into the [`Uploader`] at
//! construction time.

use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::sync::Arc;

use anyhow::{Context as _, Result, anyhow, bail};
use hoist_semgroup as semgroup;
use reqwest::blocking::{Body, Client, Response};
use reqwest::{Certificate, Method};
use serde::{Deserialize, Serialize};

use crate::artifact::{self, Artifact, ArtifactKind, Filter};
use crate::context::Context;
use crate::pipe;
use crate::report::Reporter;
use crate::tmpl::Template;

/// Uploads only compiled binaries.
pub const MODE_BINARY: &str = "binary";
/// Uploads release archives and linux packages.
pub const MODE_ARCHIVE: &str = "archive";

/// One configured upload destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadTarget {
    /// Unique label; also part of the credential environment variable names.
    pub name: String,
    /// Restricts uploads to artifacts built with these ids. Empty means all.
    pub ids: Vec<String>,
    /// Destination URL, or a template expanded per artifact.
    pub target: String,
    /// Explicit username. When empty, `<KIND>_<NAME>_USERNAME` is consulted.
    pub username: String,
    /// `archive` or `binary`.
    pub mode: String,
    /// HTTP method for the upload request.
    pub method: String,
    /// When set, each request carries this header with the artifact's sha256.
    pub checksum_header: String,
    /// PEM bundle appended to the default TLS roots.
    pub trusted_certificates: String,
    /// Also upload checksum artifacts.
    pub checksum: bool,
    /// Also upload signature artifacts.
    pub signature: bool,
    /// Deprecated: suppresses the `/<artifact name>` suffix in the default
    /// target resolver. Supply a custom resolver instead.
    pub custom_artifact_name: bool,
}

/// Validates an upload target, returning a descriptive skip when the
/// destination cannot be used.
pub fn check_target(ctx: &Context, target: &UploadTarget, kind: &str) -> Result<()> {
    if target.target.is_empty() {
        return Err(misconfigured(kind, target, "missing target"));
    }
    if target.name.is_empty() {
        return Err(misconfigured(kind, target, "missing name"));
    }
    if !is_known_mode(&target.mode) {
        return Err(misconfigured(
            kind,
            target,
            "mode must be 'binary' or 'archive'",
        ));
    }
    resolve_username(ctx, target, kind)?;
    resolve_secret(ctx, target, kind)?;
    if !target.trusted_certificates.is_empty()
        && trusted_certificates(&target.trusted_certificates).is_empty()
    {
        return Err(misconfigured(
            kind,
            target,
            "no certificate could be added from the specified trusted_certificates configuration",
        ));
    }
    Ok(())
}

fn is_known_mode(mode: &str) -> bool {
    mode.eq_ignore_ascii_case(MODE_ARCHIVE) || mode.eq_ignore_ascii_case(MODE_BINARY)
}

fn misconfigured(kind: &str, target: &UploadTarget, reason: &str) -> anyhow::Error {
    pipe::skip(format!(
        "{kind} section '{}' is not configured properly ({reason})",
        target.name
    ))
}

fn env_key(kind: &str, name: &str, suffix: &str) -> String {
    format!("{}_{}_{suffix}", kind.to_uppercase(), name.to_uppercase())
}

/// Resolves the username: the explicit config field wins, then the
/// `<KIND>_<NAME>_USERNAME` environment variable.
pub fn resolve_username(ctx: &Context, target: &UploadTarget, kind: &str) -> Result<String> {
    if !target.username.is_empty() {
        return Ok(target.username.clone());
    }
    let key = env_key(kind, &target.name, "USERNAME");
    match ctx.env.get(&key) {
        Some(username) => Ok(username.clone()),
        None => Err(misconfigured(
            kind,
            target,
            &format!("missing username or {key} environment variable"),
        )),
    }
}

/// Resolves the secret from the `<KIND>_<NAME>_SECRET` environment variable.
///
/// Secrets are read only from the environment, never from persisted
/// configuration.
pub fn resolve_secret(ctx: &Context, target: &UploadTarget, kind: &str) -> Result<String> {
    let key = env_key(kind, &target.name, "SECRET");
    match ctx.env.get(&key) {
        Some(secret) => Ok(secret.clone()),
        None => Err(misconfigured(
            kind,
            target,
            &format!("missing {key} environment variable"),
        )),
    }
}

/// Builds the artifact predicate for one target.
///
/// Checksum and signature selection is additive to the mode's payload set;
/// an id allow-list then restricts across the whole selection. An unknown
/// mode is a hard error, not a skip.
pub fn build_filter(target: &UploadTarget, kind: &str) -> Result<Filter> {
    let mut filters = Vec::new();
    if target.checksum {
        filters.push(artifact::by_kind(ArtifactKind::Checksum));
    }
    if target.signature {
        filters.push(artifact::by_kind(ArtifactKind::Signature));
    }
    match target.mode.to_ascii_lowercase().as_str() {
        MODE_ARCHIVE => {
            filters.push(artifact::by_kind(ArtifactKind::UploadableArchive));
            filters.push(artifact::by_kind(ArtifactKind::LinuxPackage));
        }
        MODE_BINARY => filters.push(artifact::by_kind(ArtifactKind::UploadableBinary)),
        other => bail!("{kind}: mode \"{other}\" not supported"),
    }
    let mut filter = artifact::or(filters);
    if !target.ids.is_empty() {
        filter = artifact::and(filter, artifact::by_ids(&target.ids));
    }
    Ok(filter)
}

/// An open artifact byte stream and its length, scoped to one upload
/// attempt. The stream moves into the request body and is closed by drop on
/// every exit path.
pub struct Asset {
    pub content: Box<dyn io::Read + Send>,
    pub size: u64,
}

/// Pluggable artifact-open hook.
pub type AssetOpener = Box<dyn Fn(&str, &Artifact) -> Result<Asset> + Send + Sync>;

/// Pluggable destination URL builder.
pub type TargetResolver =
    Box<dyn Fn(&Context, &UploadTarget, &Artifact) -> Result<String> + Send + Sync>;

/// Pluggable per-artifact extra header builder.
pub type HeaderSource =
    Box<dyn Fn(&UploadTarget, &Artifact) -> Result<BTreeMap<String, String>> + Send + Sync>;

/// Pluggable response validation. The checker owns the response; returning
/// an error marks the upload as failed.
pub type ResponseChecker = Box<dyn Fn(Response) -> Result<()> + Send + Sync>;

fn default_asset_opener() -> AssetOpener {
    Box::new(|kind, artifact| {
        let file = File::open(&artifact.path)
            .with_context(|| format!("{kind}: failed to open {}", artifact.path.display()))?;
        let meta = file
            .metadata()
            .with_context(|| format!("{kind}: failed to stat {}", artifact.path.display()))?;
        if meta.is_dir() {
            bail!("{kind}: upload failed: the asset to upload can't be a directory");
        }
        Ok(Asset {
            content: Box::new(file),
            size: meta.len(),
        })
    })
}

/// Default destination URL: the expanded target template, with `/` and the
/// artifact name appended unless the target opts out of suffixing.
pub fn default_target_url(
    ctx: &Context,
    target: &UploadTarget,
    artifact: &Artifact,
) -> Result<String> {
    let empty = BTreeMap::new();
    let replacements = if target.mode.eq_ignore_ascii_case(MODE_BINARY) {
        &ctx.replacements
    } else {
        &empty
    };
    let mut url = Template::new(ctx)
        .with_artifact(artifact, replacements)
        .apply(&target.target)?;
    if !target.custom_artifact_name {
        if !url.ends_with('/') {
            url.push('/');
        }
        url.push_str(&artifact.name);
    }
    Ok(url)
}

/// Default extra headers: the configured checksum header carrying the
/// artifact's sha256 digest.
pub fn default_extra_headers(
    target: &UploadTarget,
    artifact: &Artifact,
) -> Result<BTreeMap<String, String>> {
    let mut headers = BTreeMap::new();
    if !target.checksum_header.is_empty() {
        let sum = artifact.checksum("sha256")?;
        headers.insert(target.checksum_header.clone(), sum);
    }
    Ok(headers)
}

/// Default response policy: any status in [200, 299] passes.
pub fn success_status(response: Response) -> Result<()> {
    let status = response.status();
    if !status.is_success() {
        bail!("unexpected http response status: {status}");
    }
    Ok(())
}

/// Splits a PEM bundle into its `-----BEGIN/END-----` blocks.
pub fn split_pem_bundle(bundle: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Option<String> = None;
    for line in bundle.lines() {
        let line = line.trim_end();
        if line.starts_with("-----BEGIN ") {
            current = Some(String::new());
        }
        if let Some(block) = current.as_mut() {
            block.push_str(line);
            block.push('\n');
        }
        if line.starts_with("-----END ") {
            if let Some(block) = current.take() {
                blocks.push(block);
            }
        }
    }
    blocks
}

/// Parses every certificate in a PEM bundle, ignoring blocks that do not
/// hold a usable certificate.
pub fn trusted_certificates(bundle: &str) -> Vec<Certificate> {
    split_pem_bundle(bundle)
        .iter()
        .filter_map(|block| Certificate::from_pem(block.as_bytes()).ok())
        .collect()
}

/// Builds the client for one target: default TLS roots, plus the target's
/// trusted certificates when configured. Artifact bodies can be large, so no
/// overall request timeout is set.
pub fn http_client(target: &UploadTarget) -> Result<Client> {
    let mut builder = Client::builder().timeout(None);
    for cert in trusted_certificates(&target.trusted_certificates) {
        builder = builder.add_root_certificate(cert);
    }
    builder.build().context("failed to build http client")
}

/// The transfer engine.
///
/// Construct with [`Uploader::new`] for the default capabilities, then
/// override individual ones with the `with_*` builders.
pub struct Uploader {
    kind: String,
    resolve_target: TargetResolver,
    extra_headers: HeaderSource,
    check_response: ResponseChecker,
    open_asset: AssetOpener,
    reporter: Arc<dyn Reporter>,
}

impl Uploader {
    /// An uploader with the default URL resolver, checksum header source,
    /// 2xx response policy, and filesystem asset opener.
    pub fn new(kind: impl Into<String>, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            kind: kind.into(),
            resolve_target: Box::new(default_target_url),
            extra_headers: Box::new(default_extra_headers),
            check_response: Box::new(success_status),
            open_asset: default_asset_opener(),
            reporter,
        }
    }

    pub fn with_target_resolver(mut self, resolver: TargetResolver) -> Self {
        self.resolve_target = resolver;
        self
    }

    pub fn with_header_source(mut self, headers: HeaderSource) -> Self {
        self.extra_headers = headers;
        self
    }

    pub fn with_response_checker(mut self, checker: ResponseChecker) -> Self {
        self.check_response = checker;
        self
    }

    pub fn with_asset_opener(mut self, opener: AssetOpener) -> Self {
        self.open_asset = opener;
        self
    }

    /// Publishes every matching artifact of every target.
    ///
    /// Targets run sequentially in declaration order; each target's matching
    /// artifacts upload concurrently, bounded by the context parallelism.
    /// The first failure per target wins, but every dispatched upload runs
    /// to completion.
    pub fn publish(&self, ctx: &Context, targets: &[UploadTarget]) -> Result<()> {
        if ctx.skip_publish {
            return Err(pipe::publish_disabled());
        }
        for target in targets {
            let filter = match build_filter(target, &self.kind) {
                Ok(filter) => filter,
                Err(err) => {
                    self.reporter
                        .error(&format!("{err} (instance '{}')", target.name));
                    return Err(err);
                }
            };
            self.publish_target(ctx, target, &filter)?;
        }
        Ok(())
    }

    fn publish_target(&self, ctx: &Context, target: &UploadTarget, filter: &Filter) -> Result<()> {
        let artifacts = ctx.artifacts.filtered(filter);
        self.reporter.debug(&format!(
            "{}: will upload {} artifacts to '{}'",
            self.kind,
            artifacts.len(),
            target.name,
        ));
        semgroup::run(ctx.parallelism, artifacts, |artifact| {
            self.upload_artifact(ctx, target, artifact)
        })
    }

    /// Uploads one artifact and reports the outcome.
    fn upload_artifact(
        &self,
        ctx: &Context,
        target: &UploadTarget,
        artifact: &Artifact,
    ) -> Result<()> {
        let username = resolve_username(ctx, target, &self.kind)?;
        let secret = resolve_secret(ctx, target, &self.kind)?;

        let url = match (self.resolve_target)(ctx, target, artifact) {
            Ok(url) => url,
            Err(err) => {
                let msg = format!("{}: error while building the target url", self.kind);
                self.reporter
                    .error(&format!("{msg} (instance '{}'): {err:#}", target.name));
                return Err(err.context(msg));
            }
        };
        self.reporter
            .debug(&format!("{}: generated target url: {url}", self.kind));

        let asset = (self.open_asset)(&self.kind, artifact)?;
        let headers = (self.extra_headers)(target, artifact)?;

        if let Err(err) = self.send_asset(ctx, target, &url, &username, &secret, headers, asset) {
            let msg = format!("{}: upload failed", self.kind);
            self.reporter.error(&format!(
                "{msg} (instance '{}', username '{username}'): {err:#}",
                target.name
            ));
            return Err(err.context(msg));
        }

        self.reporter.info(&format!(
            "{}: uploaded '{}' (instance '{}', mode '{}')",
            self.kind, artifact.name, target.name, target.mode
        ));
        Ok(())
    }

    /// Builds and executes one upload request, then hands the response to
    /// the checker. The asset stream and response body are both released by
    /// the time this returns, on every path.
    #[allow(clippy::too_many_arguments)]
    fn send_asset(
        &self,
        ctx: &Context,
        target: &UploadTarget,
        url: &str,
        username: &str,
        secret: &str,
        headers: BTreeMap<String, String>,
        asset: Asset,
    ) -> Result<()> {
        let method = Method::from_bytes(target.method.as_bytes())
            .with_context(|| format!("invalid http method '{}'", target.method))?;
        let client = http_client(target)?;

        self.reporter.debug(&format!(
            "{}: executing request: {method} {url}",
            self.kind
        ));

        let mut request = client
            .request(method, url)
            .basic_auth(username, Some(secret))
            .body(Body::sized(asset.content, asset.size));
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = match request.send() {
            Ok(response) => response,
            Err(err) => {
                // A cancelled run usually surfaces as a broken transport
                // call; the cancellation is the more meaningful cause.
                if ctx.cancel.is_cancelled() {
                    return Err(anyhow!("upload cancelled"));
                }
                return Err(err.into());
            }
        };

        (self.check_response)(response)
    }
}
