//! Staging of publication artifacts under registry naming conventions.
//!
//! The build hands over files under whatever names it produced
//! (`pom-default.xml`, `module.json`, classifier jars); the registry expects
//! `<artifactId>-<version>[-<classifier>].<ext>`. Aggregation copies every
//! artifact into a clean staging directory under its target name.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{ArtifactDescriptor, Coordinates};

/// Compute the staged file name for one artifact.
///
/// Pure function of the coordinates and descriptor: descriptor/metadata
/// files get fixed names, jars get the full coordinate-based name with an
/// optional classifier segment, everything else keeps its original name.
pub fn staged_name(coordinates: &Coordinates, artifact: &ArtifactDescriptor) -> Result<String> {
    let artifact_id = &coordinates.artifact_id;
    let version = &coordinates.version;
    let file_name = artifact
        .source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            Error::InvalidInput(format!(
                "artifact source {} has no usable file name",
                artifact.source.display()
            ))
        })?;

    let name = match file_name {
        "module.json" => format!("{artifact_id}-{version}.module"),
        "module.json.asc" => format!("{artifact_id}-{version}.module.asc"),
        "pom-default.xml" => format!("{artifact_id}-{version}.pom"),
        "pom-default.xml.asc" => format!("{artifact_id}-{version}.pom.asc"),
        _ if file_name.ends_with(".jar") || file_name.ends_with(".jar.asc") => {
            let classifier = artifact
                .classifier
                .as_deref()
                .map(|c| format!("-{c}"))
                .unwrap_or_default();
            format!("{artifact_id}-{version}{classifier}.{}", artifact.extension)
        }
        other => other.to_string(),
    };
    Ok(name)
}

/// Copy every artifact into `target_directory` under its staged name.
///
/// The target directory is removed and recreated first, so the staged set is
/// exactly the descriptor list and re-running with identical inputs yields
/// byte-identical output.
pub fn aggregate(
    coordinates: &Coordinates,
    artifacts: &[ArtifactDescriptor],
    target_directory: &Path,
) -> Result<()> {
    coordinates.validate()?;

    if target_directory.exists() {
        fs::remove_dir_all(target_directory).map_err(|e| {
            Error::io(
                format!(
                    "failed to clean staging directory {}",
                    target_directory.display()
                ),
                e,
            )
        })?;
    }
    fs::create_dir_all(target_directory).map_err(|e| {
        Error::io(
            format!(
                "failed to create staging directory {}",
                target_directory.display()
            ),
            e,
        )
    })?;

    for artifact in artifacts {
        let name = staged_name(coordinates, artifact)?;
        let target = target_directory.join(&name);
        fs::copy(&artifact.source, &target).map_err(|e| {
            Error::io(
                format!(
                    "failed to copy artifact {} to {}",
                    artifact.source.display(),
                    target.display()
                ),
                e,
            )
        })?;
    }
    Ok(())
}
