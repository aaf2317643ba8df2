//! Checksum generation for staged bundle files.
//!
//! The registry requires an MD5 and SHA-1 digest next to every bundled file;
//! stronger algorithms may be added on top. Digest files are written as
//! `<filename>.<ext>` holding the lowercase hex digest and nothing else.
//! Signature files (`*.asc`) and existing digest files are never digested.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use digest::DynDigest;
use md5::Md5;
use sha1::Sha1;
use sha2::{Sha256, Sha512};

use crate::error::{Error, Result};

/// Signature files are bundled as-is and never get a checksum.
pub const SIGNATURE_SUFFIX: &str = ".asc";

const STREAM_BUFFER_LEN: usize = 8192;

/// Digest algorithms the registry understands. MD5 and SHA-1 are mandatory;
/// the rest are caller-requested extras.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl Algorithm {
    /// Parse a conventional algorithm name (`MD5`, `SHA-1`, `SHA-256`, ...).
    /// Matching ignores case and `-` separators, so `sha256` works too.
    pub fn parse(name: &str) -> Result<Self> {
        match name.replace('-', "").to_lowercase().as_str() {
            "md5" => Ok(Algorithm::Md5),
            "sha1" => Ok(Algorithm::Sha1),
            "sha256" => Ok(Algorithm::Sha256),
            "sha512" => Ok(Algorithm::Sha512),
            _ => Err(Error::UnsupportedAlgorithm(name.to_string())),
        }
    }

    /// Digest-file extension: the algorithm name with `-` stripped,
    /// lowercased (`SHA-1` -> `sha1`).
    pub fn extension(&self) -> &'static str {
        match self {
            Algorithm::Md5 => "md5",
            Algorithm::Sha1 => "sha1",
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha512 => "sha512",
        }
    }

    fn hasher(&self) -> Box<dyn DynDigest> {
        match self {
            Algorithm::Md5 => Box::new(Md5::default()),
            Algorithm::Sha1 => Box::new(Sha1::default()),
            Algorithm::Sha256 => Box::new(Sha256::default()),
            Algorithm::Sha512 => Box::new(Sha512::default()),
        }
    }
}

/// The registry's mandatory algorithm set, in the order digests are written.
pub fn required_algorithms() -> Vec<Algorithm> {
    vec![Algorithm::Md5, Algorithm::Sha1]
}

/// Resolve the full algorithm set: MD5 and SHA-1 first, then any recognized
/// extras, deduplicated. Fails on the first unrecognized name.
pub fn resolve_algorithms(extra_names: &[String]) -> Result<Vec<Algorithm>> {
    let mut algorithms = required_algorithms();
    for name in extra_names {
        let algorithm = Algorithm::parse(name)?;
        if !algorithms.contains(&algorithm) {
            algorithms.push(algorithm);
        }
    }
    Ok(algorithms)
}

/// Compute the lowercase hex digest of `path`, streamed in fixed-size chunks.
pub fn digest_file(path: &Path, algorithm: Algorithm) -> Result<String> {
    let mut file = File::open(path)
        .map_err(|e| Error::io(format!("failed to open {} for hashing", path.display()), e))?;
    let mut hasher = algorithm.hasher();
    let mut buffer = [0u8; STREAM_BUFFER_LEN];
    loop {
        let read = file
            .read(&mut buffer)
            .map_err(|e| Error::io(format!("failed to read {}", path.display()), e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Write `<file>.<ext>` next to `file` containing its digest. Returns the
/// digest file's path.
pub fn write_digest_file(file: &Path, algorithm: Algorithm) -> Result<PathBuf> {
    let hash = digest_file(file, algorithm)?;
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::InvalidInput(format!("non-UTF8 file name: {}", file.display())))?;
    let target = file.with_file_name(format!("{file_name}.{}", algorithm.extension()));
    fs::write(&target, &hash)
        .map_err(|e| Error::io(format!("failed to write digest file {}", target.display()), e))?;
    Ok(target)
}

/// Compute digests for every eligible file directly under `directory`
/// (non-recursive) and write them alongside. Eligible means: a regular file,
/// not a signature, and not already a digest file for any algorithm in the
/// requested set. Returns the digest files written.
pub fn compute_digests(directory: &Path, algorithms: &[Algorithm]) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(directory)
        .map_err(|e| Error::io(format!("failed to list directory {}", directory.display()), e))?;

    // Snapshot and sort before writing anything so freshly written digest
    // files cannot feed back into the enumeration.
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry
            .map_err(|e| Error::io(format!("failed to list directory {}", directory.display()), e))?;
        let file_type = entry
            .file_type()
            .map_err(|e| Error::io(format!("failed to stat {}", entry.path().display()), e))?;
        if file_type.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();

    let mut written = Vec::new();
    'files: for file in &files {
        let Some(name) = file.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.ends_with(SIGNATURE_SUFFIX) {
            continue;
        }
        for algorithm in algorithms {
            if name.ends_with(&format!(".{}", algorithm.extension())) {
                continue 'files;
            }
        }
        for algorithm in algorithms {
            written.push(write_digest_file(file, *algorithm)?);
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn parse_recognizes_conventional_names() {
        assert_eq!(Algorithm::parse("MD5").expect("md5"), Algorithm::Md5);
        assert_eq!(Algorithm::parse("SHA-1").expect("sha1"), Algorithm::Sha1);
        assert_eq!(Algorithm::parse("sha-256").expect("sha256"), Algorithm::Sha256);
        assert_eq!(Algorithm::parse("SHA512").expect("sha512"), Algorithm::Sha512);
    }

    #[test]
    fn parse_rejects_unknown_algorithm() {
        let err = Algorithm::parse("CRC-32").expect_err("must fail");
        assert!(matches!(err, Error::UnsupportedAlgorithm(ref n) if n == "CRC-32"));
    }

    #[test]
    fn extension_strips_dash_and_lowercases() {
        assert_eq!(Algorithm::Sha1.extension(), "sha1");
        assert_eq!(Algorithm::Md5.extension(), "md5");
    }

    #[test]
    fn resolve_always_includes_required_set() {
        let algorithms = resolve_algorithms(&[]).expect("resolve");
        assert_eq!(algorithms, vec![Algorithm::Md5, Algorithm::Sha1]);
    }

    #[test]
    fn resolve_appends_extras_without_duplicates() {
        let extras = vec!["SHA-256".to_string(), "MD5".to_string()];
        let algorithms = resolve_algorithms(&extras).expect("resolve");
        assert_eq!(
            algorithms,
            vec![Algorithm::Md5, Algorithm::Sha1, Algorithm::Sha256]
        );
    }

    #[test]
    fn empty_file_md5_matches_known_value() {
        let td = tempdir().expect("tempdir");
        let path = td.path().join("empty.jar");
        fs::write(&path, b"").expect("write");

        let hash = digest_file(&path, Algorithm::Md5).expect("digest");
        assert_eq!(hash, "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn digests_are_lowercase_hex_of_expected_length() {
        let td = tempdir().expect("tempdir");
        let path = td.path().join("a.jar");
        fs::write(&path, b"hello").expect("write");

        let md5 = digest_file(&path, Algorithm::Md5).expect("md5");
        let sha1 = digest_file(&path, Algorithm::Sha1).expect("sha1");
        assert_eq!(md5.len(), 32);
        assert_eq!(sha1.len(), 40);
        assert!(md5.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert!(sha1.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn compute_digests_writes_n_times_m_files() {
        let td = tempdir().expect("tempdir");
        fs::write(td.path().join("a.jar"), b"a").expect("write");
        fs::write(td.path().join("b.pom"), b"b").expect("write");

        let algorithms = resolve_algorithms(&[]).expect("resolve");
        let written = compute_digests(td.path(), &algorithms).expect("digest");
        assert_eq!(written.len(), 4);
        assert!(td.path().join("a.jar.md5").exists());
        assert!(td.path().join("a.jar.sha1").exists());
        assert!(td.path().join("b.pom.md5").exists());
        assert!(td.path().join("b.pom.sha1").exists());
    }

    #[test]
    fn digest_file_contains_only_the_hex_string() {
        let td = tempdir().expect("tempdir");
        fs::write(td.path().join("a.jar"), b"payload").expect("write");

        let algorithms = vec![Algorithm::Md5];
        compute_digests(td.path(), &algorithms).expect("digest");
        let content = fs::read_to_string(td.path().join("a.jar.md5")).expect("read");
        assert_eq!(content.len(), 32);
        assert!(!content.ends_with('\n'));
    }

    #[test]
    fn signature_files_are_skipped() {
        let td = tempdir().expect("tempdir");
        fs::write(td.path().join("a.jar"), b"a").expect("write");
        fs::write(td.path().join("a.jar.asc"), b"sig").expect("write");

        let algorithms = resolve_algorithms(&[]).expect("resolve");
        compute_digests(td.path(), &algorithms).expect("digest");
        assert!(!td.path().join("a.jar.asc.md5").exists());
        assert!(!td.path().join("a.jar.asc.sha1").exists());
    }

    #[test]
    fn rerun_does_not_digest_digest_files() {
        let td = tempdir().expect("tempdir");
        fs::write(td.path().join("a.jar"), b"a").expect("write");

        let algorithms = resolve_algorithms(&[]).expect("resolve");
        compute_digests(td.path(), &algorithms).expect("first run");
        let second = compute_digests(td.path(), &algorithms).expect("second run");

        // a.jar is re-digested (same content, same output), but no
        // digest-of-digest files may appear.
        assert_eq!(second.len(), 2);
        assert!(!td.path().join("a.jar.md5.md5").exists());
        assert!(!td.path().join("a.jar.sha1.md5").exists());
    }

    #[test]
    fn compute_digests_fails_on_missing_directory() {
        let td = tempdir().expect("tempdir");
        let missing = td.path().join("nope");
        let algorithms = resolve_algorithms(&[]).expect("resolve");
        let err = compute_digests(&missing, &algorithms).expect_err("must fail");
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn subdirectories_are_not_descended_into() {
        let td = tempdir().expect("tempdir");
        fs::create_dir(td.path().join("sub")).expect("mkdir");
        fs::write(td.path().join("sub").join("inner.jar"), b"x").expect("write");

        let algorithms = resolve_algorithms(&[]).expect("resolve");
        let written = compute_digests(td.path(), &algorithms).expect("digest");
        assert!(written.is_empty());
        assert!(!td.path().join("sub").join("inner.jar.md5").exists());
    }
}
