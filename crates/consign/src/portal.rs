//! HTTP client for the registry's publisher API.
//!
//! Four operations: upload a bundle, fetch a deployment's status, publish a
//! validated deployment, drop a deployment. All calls authenticate with
//! `Authorization: Bearer base64(username:password)` and fail fast on blank
//! credentials. Non-2xx responses are decoded into a typed error carrying
//! the registry's structured error body where one is present; a 404 from the
//! status endpoint is a valid "not found" outcome, not an error.

use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response, multipart};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

use crate::error::{ApiErrorBody, ApiFailure, Error, Result};
use crate::types::{Coordinates, Credentials, DeploymentStatus, PublishingType};

/// Production publisher API base path.
pub const DEFAULT_BASE_URL: &str = "https://central.sonatype.com/api/v1/publisher";

/// Multipart field name the registry expects the archive under.
const BUNDLE_FIELD: &str = "bundle";

#[derive(Debug, Clone)]
pub struct PortalClient {
    base_url: String,
    credentials: Credentials,
    http: Client,
}

impl PortalClient {
    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self> {
        let http = Client::builder()
            .user_agent(format!("consign/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::api("build HTTP client", ApiFailure::Transport(e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_header(&self) -> Result<String> {
        self.credentials.validate()?;
        let token = BASE64.encode(format!(
            "{}:{}",
            self.credentials.username, self.credentials.password
        ));
        Ok(format!("Bearer {token}"))
    }

    /// Upload a bundle archive. Returns the server-assigned deployment id.
    pub fn upload_bundle(
        &self,
        file: &Path,
        publishing_type: PublishingType,
        coordinates: &Coordinates,
    ) -> Result<String> {
        let operation = || format!("upload bundle {}", file.display());
        let auth = self.auth_header()?;

        let part = multipart::Part::file(file)
            .map_err(|e| Error::io(format!("failed to read bundle {}", file.display()), e))?
            .mime_str("application/zip")
            .map_err(|e| Error::api(operation(), ApiFailure::Transport(e)))?;
        let form = multipart::Form::new().part(BUNDLE_FIELD, part);

        let response = self
            .http
            .post(format!("{}/upload", self.base_url))
            .query(&[
                ("publishingType", publishing_type.as_query_value()),
                ("name", coordinates.name().as_str()),
            ])
            .header(AUTHORIZATION, auth)
            .multipart(form)
            .send()
            .map_err(|e| Error::api(operation(), ApiFailure::Transport(e)))?;

        if !response.status().is_success() {
            return Err(Error::api(operation(), decode_failure(response)));
        }
        let id = response
            .text()
            .map_err(|e| Error::api(operation(), ApiFailure::Transport(e)))?;
        Ok(id.trim().to_string())
    }

    /// Fetch the server's view of a deployment. `Ok(None)` means the server
    /// no longer knows the id (HTTP 404).
    pub fn get_deployment_status(&self, id: &str) -> Result<Option<DeploymentStatus>> {
        let operation = || format!("get status of deployment {id}");
        let auth = self.auth_header()?;

        let response = self
            .http
            .post(format!("{}/status", self.base_url))
            .query(&[("id", id)])
            .header(AUTHORIZATION, auth)
            .header(CONTENT_TYPE, "application/json")
            .body("")
            .send()
            .map_err(|e| Error::api(operation(), ApiFailure::Transport(e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::api(operation(), decode_failure(response)));
        }
        let status: DeploymentStatus = response
            .json()
            .map_err(|e| Error::api(operation(), ApiFailure::Transport(e)))?;
        Ok(Some(status))
    }

    /// Ask the registry to publish a validated deployment.
    pub fn publish_deployment(&self, id: &str) -> Result<()> {
        let operation = || format!("publish deployment {id}");
        let auth = self.auth_header()?;

        let response = self
            .http
            .post(format!("{}/deployment/{id}", self.base_url))
            .header(AUTHORIZATION, auth)
            .header(CONTENT_TYPE, "application/json")
            .body("")
            .send()
            .map_err(|e| Error::api(operation(), ApiFailure::Transport(e)))?;

        if !response.status().is_success() {
            return Err(Error::api(operation(), decode_failure(response)));
        }
        Ok(())
    }

    /// Remove a deployment from the registry.
    pub fn drop_deployment(&self, id: &str) -> Result<()> {
        let operation = || format!("drop deployment {id}");
        let auth = self.auth_header()?;

        let response = self
            .http
            .delete(format!("{}/deployment/{id}", self.base_url))
            .header(AUTHORIZATION, auth)
            .send()
            .map_err(|e| Error::api(operation(), ApiFailure::Transport(e)))?;

        if !response.status().is_success() {
            return Err(Error::api(operation(), decode_failure(response)));
        }
        Ok(())
    }
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false)
}

/// Decode a non-2xx response into the most specific failure available.
fn decode_failure(response: Response) -> ApiFailure {
    let status = response.status().as_u16();
    // 413 bodies are served by the frontend, never JSON.
    if status == 413 {
        return ApiFailure::PayloadTooLarge;
    }
    if !is_json(&response) {
        return ApiFailure::Http(status);
    }
    let text = match response.text() {
        Ok(text) => text,
        Err(e) => return ApiFailure::Transport(e),
    };
    match serde_json::from_str::<ApiErrorBody>(&text) {
        Ok(body) => ApiFailure::Registry(body),
        Err(e) => ApiFailure::MalformedErrorBody(e),
    }
}
