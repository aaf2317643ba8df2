use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The (groupId, artifactId, version) triple identifying a publishable unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl Coordinates {
    pub fn new(group_id: &str, artifact_id: &str, version: &str) -> Self {
        Self {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: version.to_string(),
        }
    }

    /// Colon-joined form used as the upload's `name` query parameter.
    pub fn name(&self) -> String {
        format!("{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("groupId", &self.group_id),
            ("artifactId", &self.artifact_id),
            ("version", &self.version),
        ] {
            if value.trim().is_empty() {
                return Err(Error::InvalidInput(format!(
                    "publication {field} must not be blank"
                )));
            }
        }
        Ok(())
    }
}

/// Registry credentials. Both fields must be non-blank before any API call.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(Error::InvalidCredentials("username"));
        }
        if self.password.trim().is_empty() {
            return Err(Error::InvalidCredentials("password"));
        }
        Ok(())
    }
}

/// How the registry should treat a validated deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublishingType {
    /// The registry publishes automatically once validation passes.
    Automatic,
    /// The operator publishes explicitly (publish-validated or the dashboard).
    UserManaged,
}

impl PublishingType {
    /// Wire form for the `publishingType` query parameter.
    pub fn as_query_value(&self) -> &'static str {
        match self {
            PublishingType::Automatic => "AUTOMATIC",
            PublishingType::UserManaged => "USER_MANAGED",
        }
    }
}

/// Logical role of a produced file within a publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactRole {
    Main,
    Pom,
    ModuleMetadata,
    Signature,
    Other,
}

/// One produced file handed over by the build, with enough metadata to
/// compute its registry-convention staged name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    /// Where the build left the file.
    pub source: PathBuf,
    /// Variant qualifier ("sources", "javadoc", ...), if any.
    #[serde(default)]
    pub classifier: Option<String>,
    /// File extension as the registry should see it, e.g. `jar` or `jar.asc`.
    pub extension: String,
    pub role: ArtifactRole,
}

/// A publication: coordinates plus the artifact set to bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Publication {
    #[serde(flatten)]
    pub coordinates: Coordinates,
    pub artifacts: Vec<ArtifactDescriptor>,
}

/// Runtime knobs for the bundle/upload pipeline. Assembled by the caller;
/// components never consult ambient state.
#[derive(Debug, Clone)]
pub struct PublishOptions {
    pub publishing_type: PublishingType,
    /// Digest algorithm names beyond the mandatory MD5 + SHA-1.
    pub extra_algorithms: Vec<String>,
    /// Where staging output and the bundle archive are written.
    pub work_dir: PathBuf,
}

/// Server-side deployment lifecycle states.
///
/// `Validated` is the portal's readiness signal between validation and
/// publish; `Unknown` absorbs any state a newer server may report so a
/// refresh never fails on an unrecognized value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentState {
    Pending,
    Validating,
    Validated,
    Publishing,
    Published,
    Failed,
    #[serde(other)]
    Unknown,
}

/// Status body returned by the portal's `/status` endpoint.
///
/// `errors` is registry-defined and deliberately left as an opaque JSON
/// value; its shape is not validated here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStatus {
    pub deployment_id: String,
    #[serde(default)]
    pub deployment_name: String,
    pub deployment_state: DeploymentState,
    #[serde(default)]
    pub errors: serde_json::Value,
}

impl DeploymentStatus {
    pub fn is_published(&self) -> bool {
        self.deployment_state == DeploymentState::Published
    }

    pub fn is_validated(&self) -> bool {
        self.deployment_state == DeploymentState::Validated
    }

    pub fn is_failed(&self) -> bool {
        self.deployment_state == DeploymentState::Failed
    }
}

/// A locally tracked deployment: server-assigned id, the last status the
/// server reported (none right after upload), and when we last touched it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    pub deployment: Option<DeploymentStatus>,
    pub timestamp: DateTime<Utc>,
}

impl Deployment {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            deployment: None,
            timestamp: Utc::now(),
        }
    }

    /// Copy with a fresh status and timestamp.
    pub fn updated(&self, status: DeploymentStatus) -> Self {
        Self {
            id: self.id.clone(),
            deployment: Some(status),
            timestamp: Utc::now(),
        }
    }

    pub fn state(&self) -> Option<DeploymentState> {
        self.deployment.as_ref().map(|s| s.deployment_state)
    }
}
