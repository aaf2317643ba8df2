//! Lifecycle orchestration: the linear bundle/upload pipeline and the batch
//! operations that reconcile the local store against the registry.
//!
//! Pipeline order is fixed: aggregate -> digest -> archive -> upload ->
//! record. Batch operations load the store once, walk `current` entries in
//! store order, and save once at the end; the first sub-operation failure
//! aborts the batch without persisting partial progress, so the operator
//! always knows none of the later entries were touched.

use std::path::PathBuf;

use crate::archive;
use crate::aggregate;
use crate::digest;
use crate::error::{Error, Result};
use crate::portal::PortalClient;
use crate::store::{DeploymentStore, DeploymentsData};
use crate::types::{Deployment, DeploymentState, Publication, PublishOptions};

/// Progress output seam. The library never prints; the caller decides how
/// messages surface.
pub trait Reporter {
    fn info(&mut self, msg: &str);
    fn warn(&mut self, msg: &str);
    fn error(&mut self, msg: &str);
}

/// Stage, digest and archive a publication. Returns the bundle path.
pub fn run_bundle(
    publication: &Publication,
    opts: &PublishOptions,
    reporter: &mut dyn Reporter,
) -> Result<PathBuf> {
    publication.coordinates.validate()?;
    let staging = opts.work_dir.join("staging");

    reporter.info(&format!(
        "aggregating {} artifact(s) into {}",
        publication.artifacts.len(),
        staging.display()
    ));
    aggregate::aggregate(&publication.coordinates, &publication.artifacts, &staging)?;

    let algorithms = digest::resolve_algorithms(&opts.extra_algorithms)?;
    let written = digest::compute_digests(&staging, &algorithms)?;
    reporter.info(&format!("wrote {} digest file(s)", written.len()));

    let bundle = opts.work_dir.join(format!(
        "{}-{}-bundle.zip",
        publication.coordinates.artifact_id, publication.coordinates.version
    ));
    archive::build_archive(&staging, &bundle)?;
    reporter.info(&format!("created bundle {}", bundle.display()));
    Ok(bundle)
}

/// Full pipeline: bundle, upload, record the deployment as in-flight.
/// Returns the server-assigned deployment id.
pub fn run_upload(
    publication: &Publication,
    opts: &PublishOptions,
    client: &PortalClient,
    store: &DeploymentStore,
    reporter: &mut dyn Reporter,
) -> Result<String> {
    let bundle = run_bundle(publication, opts, reporter)?;

    reporter.info(&format!(
        "uploading {} to {}",
        publication.coordinates.name(),
        client.base_url()
    ));
    let id = client.upload_bundle(&bundle, opts.publishing_type, &publication.coordinates)?;
    store.put_current(Deployment::new(&id))?;
    reporter.info(&format!("upload accepted, deployment id {id}"));
    Ok(id)
}

/// Fetch the server's status for every targeted `current` entry and
/// reconcile: gone on the server removes the entry from both collections, a
/// published status moves it to `published`, anything else refreshes the
/// cached status in place. Saves once at the end when anything was visited.
pub fn refresh_deployments(
    client: &PortalClient,
    store: &DeploymentStore,
    only_id: Option<&str>,
) -> Result<DeploymentsData> {
    let mut data = store.load()?;
    let ids: Vec<String> = data
        .current
        .keys()
        .filter(|id| only_id.is_none_or(|only| only == id.as_str()))
        .cloned()
        .collect();

    for id in &ids {
        match client.get_deployment_status(id)? {
            None => {
                data.current.remove(id);
                data.published.remove(id);
            }
            Some(status) if status.is_published() => {
                let entry = data
                    .current
                    .remove(id)
                    .expect("id was collected from current");
                data.published.insert(id.clone(), entry.updated(status));
            }
            Some(status) => {
                let refreshed = data
                    .current
                    .get(id)
                    .expect("id was collected from current")
                    .updated(status);
                data.current.insert(id.clone(), refreshed);
            }
        }
    }

    if !ids.is_empty() {
        store.save(&data)?;
    }
    Ok(data)
}

/// Refresh, then print every tracked deployment's state. With `only_id`,
/// report just that deployment; a blank id or an id the store does not know
/// is an error.
pub fn check_deployments(
    client: &PortalClient,
    store: &DeploymentStore,
    only_id: Option<&str>,
    reporter: &mut dyn Reporter,
) -> Result<DeploymentsData> {
    if let Some(id) = only_id {
        if id.trim().is_empty() {
            return Err(Error::InvalidInput(
                "passed deployment id is blank".to_string(),
            ));
        }
    }

    let data = refresh_deployments(client, store, only_id)?;

    if let Some(id) = only_id {
        let deployment = data
            .get(id)
            .ok_or_else(|| Error::InvalidInput(format!("no deployment with id {id} stored")))?;
        report_deployment(deployment, reporter);
        return Ok(data);
    }

    if data.current.is_empty() {
        reporter.info("no unreleased deployments stored");
        return Ok(data);
    }
    reporter.info(&format!(
        "status of {} unreleased deployment(s):",
        data.current.len()
    ));
    for deployment in data.current.values() {
        report_deployment(deployment, reporter);
    }
    Ok(data)
}

fn report_deployment(deployment: &Deployment, reporter: &mut dyn Reporter) {
    match &deployment.deployment {
        Some(status) => {
            reporter.info(&format!(
                "deployment {} - {:?} ({})",
                deployment.id, status.deployment_state, status.deployment_name
            ));
            let no_errors = status.errors.is_null()
                || status.errors.as_object().is_some_and(|m| m.is_empty());
            if !no_errors {
                reporter.warn(&format!("  errors: {}", status.errors));
            }
        }
        None => reporter.info(&format!("deployment {} - UNKNOWN", deployment.id)),
    }
}

/// Drop one deployment by id and stop tracking it.
pub fn drop_deployment(
    client: &PortalClient,
    store: &DeploymentStore,
    id: &str,
    reporter: &mut dyn Reporter,
) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::InvalidInput(
            "passed deployment id is blank".to_string(),
        ));
    }
    client.drop_deployment(id)?;
    store.remove_current(id)?;
    reporter.info(&format!("deployment {id} dropped"));
    Ok(())
}

/// Publish one deployment by id. When the store tracks it with a cached
/// status, that status moves to `PUBLISHING` optimistically; an entry
/// without a cached status is left for the next refresh to fill in.
pub fn publish_deployment(
    client: &PortalClient,
    store: &DeploymentStore,
    id: &str,
    reporter: &mut dyn Reporter,
) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::InvalidInput(
            "passed deployment id is blank".to_string(),
        ));
    }
    client.publish_deployment(id)?;
    store.update(id, |existing| {
        existing.map(|entry| match entry.deployment.clone() {
            Some(mut status) => {
                status.deployment_state = DeploymentState::Publishing;
                entry.updated(status)
            }
            None => entry,
        })
    })?;
    reporter.info(&format!("deployment {id} is now publishing"));
    Ok(())
}

/// Refresh, then drop every `current` entry whose cached state is `FAILED`.
/// Returns how many were dropped.
pub fn drop_failed_deployments(
    client: &PortalClient,
    store: &DeploymentStore,
    reporter: &mut dyn Reporter,
) -> Result<usize> {
    let mut data = refresh_deployments(client, store, None)?;
    let total = data.current.len();

    let failed: Vec<String> = data
        .current
        .iter()
        .filter(|(_, d)| d.deployment.as_ref().is_some_and(|s| s.is_failed()))
        .map(|(id, _)| id.clone())
        .collect();

    let mut dropped = 0;
    for id in &failed {
        client.drop_deployment(id)?;
        data.current.remove(id);
        dropped += 1;
    }

    reporter.info(&format!(
        "dropped {dropped} failed deployment(s) out of total {total}"
    ));
    if dropped > 0 {
        store.save(&data)?;
    }
    Ok(dropped)
}

/// Refresh, then ask the registry to publish every `current` entry whose
/// cached state is `VALIDATED`. Each published entry's cached state moves to
/// `PUBLISHING` optimistically; the next refresh reconciles with server
/// truth. Returns how many publish calls were made.
pub fn publish_validated_deployments(
    client: &PortalClient,
    store: &DeploymentStore,
    reporter: &mut dyn Reporter,
) -> Result<usize> {
    let mut data = refresh_deployments(client, store, None)?;
    let total = data.current.len();

    let validated: Vec<String> = data
        .current
        .iter()
        .filter(|(_, d)| d.deployment.as_ref().is_some_and(|s| s.is_validated()))
        .map(|(id, _)| id.clone())
        .collect();

    let mut published = 0;
    for id in &validated {
        client.publish_deployment(id)?;
        let entry = data.current.get(id).expect("id was collected from current");
        let mut status = entry
            .deployment
            .clone()
            .expect("validated entries carry a status");
        status.deployment_state = DeploymentState::Publishing;
        let updated = entry.updated(status);
        data.current.insert(id.clone(), updated);
        published += 1;
    }

    reporter.info(&format!(
        "published {published} validated deployment(s) out of total {total}; \
         run check to follow their status"
    ));
    if published > 0 {
        store.save(&data)?;
    }
    Ok(published)
}
