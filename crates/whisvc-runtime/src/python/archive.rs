//! Archive extraction for interpreter downloads.

use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Failed to read archive {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Archive entry escapes the target directory: {0}")]
    UnsafeEntry(String),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Path configuration {0} not found in runtime")]
    PathConfigMissing(PathBuf),
}

/// Extract `archive` into `dest`, dropping `strip_prefix` from every entry.
///
/// Returns the number of files written.
pub fn extract_archive(
    archive: &Path,
    kind: ArchiveKind,
    dest: &Path,
    strip_prefix: Option<&str>,
) -> Result<usize, ArchiveError> {
    fs::create_dir_all(dest).map_err(|source| ArchiveError::Write {
        path: dest.to_path_buf(),
        source,
    })?;

    let count = match kind {
        ArchiveKind::Zip => extract_zip(archive, dest, strip_prefix)?,
        ArchiveKind::TarGz => extract_tar_gz(archive, dest, strip_prefix)?,
    };
    debug!(archive = %archive.display(), dest = %dest.display(), files = count, "Archive extracted");
    Ok(count)
}

/// Map an entry path to its destination, or `None` if it is the stripped
/// prefix itself.
fn destination(dest: &Path, entry: &Path, strip_prefix: Option<&str>) -> Result<Option<PathBuf>, ArchiveError> {
    let relative = match strip_prefix {
        Some(prefix) => match entry.strip_prefix(prefix) {
            Ok(rest) => rest,
            Err(_) => entry,
        },
        None => entry,
    };
    if relative.as_os_str().is_empty() {
        return Ok(None);
    }
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(ArchiveError::UnsafeEntry(entry.display().to_string()));
    }
    Ok(Some(dest.join(relative)))
}

fn read_error(archive: &Path, e: impl ToString) -> ArchiveError {
    ArchiveError::Read {
        path: archive.to_path_buf(),
        reason: e.to_string(),
    }
}

fn extract_zip(archive: &Path, dest: &Path, strip_prefix: Option<&str>) -> Result<usize, ArchiveError> {
    let file = File::open(archive).map_err(|e| read_error(archive, e))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| read_error(archive, e))?;

    let mut written = 0;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|e| read_error(archive, e))?;
        let Some(name) = entry.enclosed_name() else {
            return Err(ArchiveError::UnsafeEntry(entry.name().to_string()));
        };
        let Some(target) = destination(dest, &name, strip_prefix)? else {
            continue;
        };

        let write_err = |source| ArchiveError::Write {
            path: target.clone(),
            source,
        };
        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(write_err)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let mut out = File::create(&target).map_err(write_err)?;
        io::copy(&mut entry, &mut out).map_err(write_err)?;
        written += 1;
    }
    Ok(written)
}

fn extract_tar_gz(archive: &Path, dest: &Path, strip_prefix: Option<&str>) -> Result<usize, ArchiveError> {
    let file = File::open(archive).map_err(|e| read_error(archive, e))?;
    let mut tar = tar::Archive::new(GzDecoder::new(file));
    tar.set_preserve_permissions(true);

    let mut written = 0;
    for entry in tar.entries().map_err(|e| read_error(archive, e))? {
        let mut entry = entry.map_err(|e| read_error(archive, e))?;
        let path = entry.path().map_err(|e| read_error(archive, e))?.into_owned();
        let Some(target) = destination(dest, &path, strip_prefix)? else {
            continue;
        };
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| ArchiveError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        entry.unpack(&target).map_err(|source| ArchiveError::Write {
            path: target.clone(),
            source,
        })?;
        if entry.header().entry_type().is_file() {
            written += 1;
        }
    }
    Ok(written)
}

/// Enable `import site` in an embeddable runtime's `._pth` file so the
/// package manager and installed packages are importable.
pub fn patch_path_config(runtime_dir: &Path, file_name: &str) -> Result<(), ArchiveError> {
    let path = runtime_dir.join(file_name);
    let original = fs::read_to_string(&path).map_err(|_| ArchiveError::PathConfigMissing(path.clone()))?;

    let mut lines: Vec<String> = original
        .lines()
        .map(|line| {
            if line.trim() == "#import site" {
                "import site".to_string()
            } else {
                line.to_string()
            }
        })
        .collect();
    if !lines.iter().any(|l| l.trim() == "import site") {
        lines.push("import site".to_string());
    }
    if !lines.iter().any(|l| l.trim() == "Lib\\site-packages") {
        lines.push("Lib\\site-packages".to_string());
    }

    let mut patched = lines.join("\n");
    patched.push('\n');
    fs::write(&path, patched).map_err(|source| ArchiveError::Write { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn build_tar_gz(path: &Path, files: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::fast());
        let mut builder = tar::Builder::new(encoder);
        for (name, bytes) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(bytes.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, name, *bytes).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn tar_gz_prefix_is_stripped() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("runtime.tar.gz");
        build_tar_gz(
            &archive,
            &[
                ("python/bin/python3", &b"#!/bin/sh\n"[..]),
                ("python/lib/os.py", &b"# os\n"[..]),
            ],
        );

        let dest = temp.path().join("out");
        let count = extract_archive(&archive, ArchiveKind::TarGz, &dest, Some("python")).unwrap();
        assert_eq!(count, 2);
        assert!(dest.join("bin/python3").is_file());
        assert!(dest.join("lib/os.py").is_file());
        assert!(!dest.join("python").exists());
    }

    #[test]
    fn zip_is_extracted_in_place() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("runtime.zip");
        {
            let mut zip = zip::ZipWriter::new(File::create(&archive).unwrap());
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("python.exe", options).unwrap();
            zip.write_all(b"MZ").unwrap();
            zip.start_file("python311._pth", options).unwrap();
            zip.write_all(b"python311.zip\n.\n#import site\n").unwrap();
            zip.finish().unwrap();
        }

        let dest = temp.path().join("out");
        extract_archive(&archive, ArchiveKind::Zip, &dest, None).unwrap();
        assert!(dest.join("python.exe").is_file());

        patch_path_config(&dest, "python311._pth").unwrap();
        let patched = fs::read_to_string(dest.join("python311._pth")).unwrap();
        assert!(patched.lines().any(|l| l == "import site"));
        assert!(!patched.contains("#import site"));
    }

    #[test]
    fn entries_escaping_target_are_rejected() {
        let dest = Path::new("/tmp/whisvc-extract");
        assert!(matches!(
            destination(dest, Path::new("../etc/passwd"), None),
            Err(ArchiveError::UnsafeEntry(_))
        ));
        assert_eq!(destination(dest, Path::new("python"), Some("python")).unwrap(), None);
    }

    #[test]
    fn missing_path_config_is_reported() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            patch_path_config(temp.path(), "python311._pth"),
            Err(ArchiveError::PathConfigMissing(_))
        ));
    }
}
