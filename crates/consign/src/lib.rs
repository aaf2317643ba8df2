//! # Consign
//!
//! Bundle build artifacts for a Maven-Central-style registry and track the
//! asynchronous validation/publication lifecycle of each submission.
//!
//! Consign covers the path from "the build produced these files" to "the
//! registry published them": it stages artifacts under the registry's naming
//! convention, writes the mandatory checksums, packages everything into a
//! single zip bundle, uploads it, and then keeps a local ledger of every
//! in-flight deployment that survives process restarts.
//!
//! ## Pipeline
//!
//! The dependency order is linear: **aggregate → digest → archive → upload
//! → track**.
//!
//! 1. [`aggregate::aggregate`] copies the publication's artifacts into a
//!    clean staging directory under their registry names.
//! 2. [`digest::compute_digests`] writes MD5/SHA-1 (plus any extra)
//!    checksum files alongside every staged file.
//! 3. [`archive::build_archive`] packages the staging directory into a
//!    deterministic zip bundle.
//! 4. [`portal::PortalClient::upload_bundle`] submits the bundle and
//!    returns the server-assigned deployment id.
//! 5. [`store::DeploymentStore`] records the id; the batch operations in
//!    [`engine`] reconcile local state against the server on later runs.
//!
//! ## Deployment lifecycle
//!
//! The server walks a deployment through `PENDING → VALIDATING → VALIDATED
//! → PUBLISHING → PUBLISHED`, or into `FAILED`. Locally, `PUBLISHED` moves
//! an entry from the store's `current` map to `published`, and a server-side
//! 404 discards it entirely. `FAILED` entries stay in `current` until
//! explicitly dropped.
//!
//! ## Errors
//!
//! Everything fatal is a typed [`error::Error`]; the one deliberate
//! non-error is a 404 from the status endpoint, which surfaces as
//! `Ok(None)`. There is no retry logic anywhere in this crate — failures
//! propagate immediately and the caller decides whether to abort the run.

/// Staging of publication artifacts under registry naming conventions.
pub mod aggregate;

/// Deterministic zip packaging of the staging directory.
pub mod archive;

/// Configuration file (`consign.toml`) loading and credential resolution.
pub mod config;

/// Checksum generation for staged bundle files.
pub mod digest;

/// Lifecycle orchestration: upload pipeline and batch reconciliation.
pub mod engine;

/// Typed error taxonomy for the whole crate.
pub mod error;

/// HTTP client for the registry's publisher API.
pub mod portal;

/// Persisted deployment tracking (`deployments.json`).
pub mod store;

/// Domain types: coordinates, artifacts, deployments, statuses.
pub mod types;

pub use error::{Error, Result};
