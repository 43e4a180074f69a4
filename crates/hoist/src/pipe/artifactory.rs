//! Artifactory deployment pipe.
//!
//! Deploys artifacts through the Artifactory REST API's deploy endpoint,
//! which accepts PUT requests only and answers with a JSON document
//! describing the deployed artifact.

use std::sync::Arc;

use anyhow::{Context as _, Result, bail};
use reqwest::blocking::Response;
use serde::Deserialize;

use crate::context::Context;
use crate::pipe;
use crate::report::Reporter;
use crate::transfer::{self, UploadTarget, Uploader};

/// Kind tag: names this pipe in errors, logs, and env var lookups.
pub const KIND: &str = "artifactory";

/// Document returned by a successful deployment request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeployResponse {
    pub repo: String,
    pub path: String,
    pub created: String,
    pub created_by: String,
    pub download_uri: String,
    pub mime_type: String,
    /// Byte size, returned by the API as a string.
    pub size: String,
    pub checksums: DeployChecksums,
    pub original_checksums: DeployChecksums,
    pub uri: String,
}

/// Checksums computed by Artifactory for a deployed artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeployChecksums {
    pub sha1: String,
    pub md5: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ErrorEnvelope {
    errors: Vec<ApiError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ApiError {
    status: i64,
    message: String,
}

/// Fills unset fields. The deploy endpoint is PUT-only, so the method is
/// forced unconditionally.
pub fn apply_defaults(targets: &mut [UploadTarget]) {
    for target in targets {
        if target.mode.is_empty() {
            target.mode = transfer::MODE_ARCHIVE.to_string();
        }
        target.method = "PUT".to_string();
    }
}

/// Validates one deployment response.
///
/// 2xx responses must decode as the deployment document. Other statuses
/// surface the url, the status, and every message of the error envelope;
/// bodies that are not the envelope surface the url and status alone.
fn check_response(response: Response) -> Result<()> {
    let url = response.url().clone();
    let status = response.status();
    if status.is_success() {
        response
            .json::<DeployResponse>()
            .with_context(|| format!("invalid artifactory deployment response from {url}"))?;
        return Ok(());
    }

    let body = response.text().unwrap_or_default();
    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) if !envelope.errors.is_empty() => {
            let messages: Vec<String> = envelope
                .errors
                .iter()
                .map(|e| format!("{} ({})", e.message, e.status))
                .collect();
            bail!(
                "artifactory request to {url} failed with {status}: {}",
                messages.join("; ")
            );
        }
        _ => bail!("artifactory request to {url} failed with {status}"),
    }
}

/// Publishes every configured target through the deploy endpoint.
pub fn publish(ctx: &Context, targets: &[UploadTarget], reporter: Arc<dyn Reporter>) -> Result<()> {
    if targets.is_empty() {
        return Err(pipe::skip("artifactory section is not configured"));
    }
    for target in targets {
        transfer::check_target(ctx, target, KIND)?;
    }
    Uploader::new(KIND, reporter)
        .with_response_checker(Box::new(check_response))
        .publish(ctx, targets)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::{Arc, Mutex};
    use std::thread;

    use reqwest::blocking::Client;
    use tempfile::tempdir;
    use tiny_http::{Header, Response as ServerResponse, Server, StatusCode};

    use crate::artifact::{Artifact, ArtifactKind};
    use crate::report::StderrReporter;

    use super::*;

    const DEPLOY_BODY: &str = r#"{
        "repo": "example-repo-local",
        "path": "/app/1.0/app.tar.gz",
        "created": "2026-08-21T10:00:00.000Z",
        "createdBy": "sailor",
        "downloadUri": "https://example.com/artifactory/example-repo-local/app.tar.gz",
        "mimeType": "application/x-gzip",
        "size": "7",
        "checksums": {"sha1": "da39a3ee", "md5": "d41d8cd9", "sha256": "e3b0c442"},
        "originalChecksums": {"sha256": "e3b0c442"},
        "uri": "https://example.com/artifactory/example-repo-local/app.tar.gz"
    }"#;

    struct TestServer {
        base_url: String,
        seen: Arc<Mutex<Vec<(String, String)>>>,
        handle: thread::JoinHandle<()>,
    }

    impl TestServer {
        fn join(self) -> Vec<(String, String)> {
            self.handle.join().expect("join server");
            Arc::try_unwrap(self.seen)
                .expect("seen refs")
                .into_inner()
                .expect("lock")
        }
    }

    fn spawn_server(expected_requests: usize, status: u16, body: &str) -> TestServer {
        let server = Server::http("127.0.0.1:0").expect("server");
        let base_url = format!("http://{}", server.server_addr());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_thread = Arc::clone(&seen);
        let body = body.to_string();

        let handle = thread::spawn(move || {
            for _ in 0..expected_requests {
                let req = server.recv().expect("request");
                seen_thread
                    .lock()
                    .expect("lock")
                    .push((req.method().to_string(), req.url().to_string()));
                let resp = ServerResponse::from_string(body.clone())
                    .with_status_code(StatusCode(status))
                    .with_header(
                        Header::from_bytes("Content-Type", "application/json").expect("header"),
                    );
                req.respond(resp).expect("respond");
            }
        });

        TestServer {
            base_url,
            seen,
            handle,
        }
    }

    fn fetch(server: &TestServer) -> Response {
        Client::new()
            .get(format!("{}/probe", server.base_url))
            .send()
            .expect("request")
    }

    #[test]
    fn deploy_response_decodes_the_camel_case_document() {
        let doc: DeployResponse = serde_json::from_str(DEPLOY_BODY).expect("decode");
        assert_eq!(doc.repo, "example-repo-local");
        assert_eq!(doc.created_by, "sailor");
        assert_eq!(
            doc.download_uri,
            "https://example.com/artifactory/example-repo-local/app.tar.gz"
        );
        assert_eq!(doc.checksums.sha256, "e3b0c442");
        assert_eq!(doc.original_checksums.sha256, "e3b0c442");
        assert_eq!(doc.size, "7");
    }

    #[test]
    fn apply_defaults_forces_put() {
        let mut targets = vec![UploadTarget {
            method: "POST".to_string(),
            ..UploadTarget::default()
        }];
        apply_defaults(&mut targets);
        assert_eq!(targets[0].method, "PUT");
        assert_eq!(targets[0].mode, "archive");
    }

    #[test]
    fn check_response_accepts_a_valid_deployment_document() {
        let server = spawn_server(1, 201, DEPLOY_BODY);
        assert!(check_response(fetch(&server)).is_ok());
        server.join();
    }

    #[test]
    fn check_response_rejects_2xx_with_an_undecodable_body() {
        let server = spawn_server(1, 200, "not json");
        let err = check_response(fetch(&server)).unwrap_err();
        server.join();
        assert!(
            format!("{err:#}").contains("invalid artifactory deployment response"),
            "err: {err:#}"
        );
    }

    #[test]
    fn check_response_surfaces_every_envelope_message() {
        let body = r#"{"errors": [
            {"status": 401, "message": "Bad credentials"},
            {"status": 403, "message": "Deploy denied"}
        ]}"#;
        let server = spawn_server(1, 401, body);
        let err = check_response(fetch(&server)).unwrap_err();
        server.join();

        let msg = err.to_string();
        assert!(msg.contains("/probe"));
        assert!(msg.contains("401 Unauthorized"));
        assert!(msg.contains("Bad credentials (401)"));
        assert!(msg.contains("Deploy denied (403)"));
    }

    #[test]
    fn check_response_falls_back_to_the_bare_status() {
        let server = spawn_server(1, 500, "<html>boom</html>");
        let err = check_response(fetch(&server)).unwrap_err();
        server.join();

        let msg = err.to_string();
        assert!(msg.contains("failed with 500 Internal Server Error"));
        assert!(!msg.contains("boom"));
    }

    #[test]
    fn publish_without_targets_is_a_skip() {
        let ctx = Context::new("hoist", "1.0.0");
        let err = publish(&ctx, &[], Arc::new(StderrReporter)).unwrap_err();
        assert!(pipe::is_skip(&err));
        assert_eq!(err.to_string(), "artifactory section is not configured");
    }

    #[test]
    fn publish_deploys_with_put_and_decodes_the_response() {
        let td = tempdir().expect("tempdir");
        let server = spawn_server(1, 201, DEPLOY_BODY);

        let mut ctx = Context::new("hoist", "1.0.0");
        ctx.env
            .insert("ARTIFACTORY_PROD_SECRET".to_string(), "hunter2".to_string());
        let path = td.path().join("app.tar.gz");
        fs::write(&path, b"payload").expect("write artifact");
        ctx.artifacts.add(Artifact {
            name: "app.tar.gz".to_string(),
            path,
            kind: ArtifactKind::UploadableArchive,
            id: "app".to_string(),
            os: "linux".to_string(),
            arch: "amd64".to_string(),
        });

        let mut targets = vec![UploadTarget {
            name: "prod".to_string(),
            target: format!("{}/artifactory/example-repo-local", server.base_url),
            username: "sailor".to_string(),
            method: "POST".to_string(),
            ..UploadTarget::default()
        }];
        apply_defaults(&mut targets);
        publish(&ctx, &targets, Arc::new(StderrReporter)).expect("publish");

        let seen = server.join();
        assert_eq!(
            seen,
            vec![(
                "PUT".to_string(),
                "/artifactory/example-repo-local/app.tar.gz".to_string()
            )]
        );
    }
}
