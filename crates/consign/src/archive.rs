//! Deterministic zip packaging of the staging directory.
//!
//! Entry names are `/`-separated paths relative to the source directory,
//! regardless of host path conventions. Only regular files become entries;
//! empty directories are not represented.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use walkdir::WalkDir;
use zip::ZipWriter;
use zip::write::FileOptions;

use crate::error::{Error, Result};

/// Package `source_directory` recursively into `target_file`, overwriting
/// any existing archive. Parent directories of the target are created.
pub fn build_archive(source_directory: &Path, target_file: &Path) -> Result<()> {
    if !source_directory.is_dir() {
        return Err(Error::InvalidInput(format!(
            "source folder {} does not exist",
            source_directory.display()
        )));
    }
    if let Some(parent) = target_file.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            Error::io(
                format!("failed to create archive directory {}", parent.display()),
                e,
            )
        })?;
    }

    let file = File::create(target_file).map_err(|e| {
        Error::io(
            format!("failed to create archive {}", target_file.display()),
            e,
        )
    })?;
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::default();

    // sort_by_file_name keeps entry order stable for a given file set.
    for entry in WalkDir::new(source_directory).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            Error::InvalidInput(format!(
                "failed to walk {}: {e}",
                source_directory.display()
            ))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path
            .strip_prefix(source_directory)
            .expect("walked path is under the source directory")
            .to_string_lossy()
            .replace('\\', "/");

        writer
            .start_file(relative.as_str(), options)
            .map_err(|e| Error::Archive {
                path: target_file.to_path_buf(),
                source: e,
            })?;
        let mut source = File::open(path)
            .map_err(|e| Error::io(format!("failed to read {}", path.display()), e))?;
        io::copy(&mut source, &mut writer).map_err(|e| {
            Error::io(
                format!(
                    "failed to copy {} into archive {}",
                    path.display(),
                    target_file.display()
                ),
                e,
            )
        })?;
    }

    let mut inner = writer.finish().map_err(|e| Error::Archive {
        path: target_file.to_path_buf(),
        source: e,
    })?;
    inner.flush().map_err(|e| {
        Error::io(
            format!("failed to flush archive {}", target_file.display()),
            e,
        )
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Read;

    use tempfile::tempdir;

    use super::*;

    fn entry_names(archive: &Path) -> Vec<String> {
        let file = fs::File::open(archive).expect("open archive");
        let mut zip = zip::ZipArchive::new(file).expect("read archive");
        (0..zip.len())
            .map(|i| zip.by_index(i).expect("entry").name().to_string())
            .collect()
    }

    #[test]
    fn archives_files_with_relative_forward_slash_paths() {
        let td = tempdir().expect("tempdir");
        let src = td.path().join("staging");
        fs::create_dir_all(src.join("nested")).expect("mkdir");
        fs::write(src.join("a.jar"), b"a").expect("write");
        fs::write(src.join("nested").join("b.pom"), b"b").expect("write");

        let target = td.path().join("out").join("bundle.zip");
        build_archive(&src, &target).expect("build archive");

        let names = entry_names(&target);
        assert!(names.contains(&"a.jar".to_string()));
        assert!(names.contains(&"nested/b.pom".to_string()));
    }

    #[test]
    fn round_trip_preserves_bytes() {
        let td = tempdir().expect("tempdir");
        let src = td.path().join("staging");
        fs::create_dir_all(&src).expect("mkdir");
        let payload = b"artifact bytes".to_vec();
        fs::write(src.join("lib-1.0.jar"), &payload).expect("write");

        let target = td.path().join("bundle.zip");
        build_archive(&src, &target).expect("build archive");

        let file = fs::File::open(&target).expect("open");
        let mut zip = zip::ZipArchive::new(file).expect("read");
        let mut entry = zip.by_name("lib-1.0.jar").expect("entry");
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes).expect("read entry");
        assert_eq!(bytes, payload);
    }

    #[test]
    fn empty_directories_produce_no_entries() {
        let td = tempdir().expect("tempdir");
        let src = td.path().join("staging");
        fs::create_dir_all(src.join("empty")).expect("mkdir");
        fs::write(src.join("a.jar"), b"a").expect("write");

        let target = td.path().join("bundle.zip");
        build_archive(&src, &target).expect("build archive");

        assert_eq!(entry_names(&target), vec!["a.jar".to_string()]);
    }

    #[test]
    fn missing_source_is_invalid_input() {
        let td = tempdir().expect("tempdir");
        let err = build_archive(&td.path().join("nope"), &td.path().join("bundle.zip"))
            .expect_err("must fail");
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn overwrites_existing_target() {
        let td = tempdir().expect("tempdir");
        let src = td.path().join("staging");
        fs::create_dir_all(&src).expect("mkdir");
        fs::write(src.join("a.jar"), b"a").expect("write");

        let target = td.path().join("bundle.zip");
        fs::write(&target, b"stale non-zip content").expect("pre-write");
        build_archive(&src, &target).expect("build archive");

        assert_eq!(entry_names(&target), vec!["a.jar".to_string()]);
    }
}
