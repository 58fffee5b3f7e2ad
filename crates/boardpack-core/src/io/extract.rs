//! Archive extraction module
//!
//! Handles tar.bz2, tar.gz, tar.zst, plain tar and zip archives. Every
//! supported archive is expected to hold exactly one top-level directory,
//! which becomes the installed tree.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::ZipArchive;
use zstd::stream::Decoder as ZstdDecoder;

/// Failures while unpacking or placing an archive.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Filesystem error in the scratch or destination tree.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// File name matches no known archive extension.
    #[error("Unsupported archive format: {0}")]
    UnsupportedFormat(String),

    /// Corrupt or truncated archive.
    #[error("Archive error: {0}")]
    Archive(String),

    /// The archive did not unpack to a single directory.
    #[error("{archive} must contain exactly one top-level directory, found {found}")]
    Layout {
        /// Archive file name
        archive: String,
        /// Top-level names found, or `nothing`
        found: String,
    },

    /// Neither rename nor copy could move the tree into place.
    #[error("failed to move {} to {}: {reason}", .from.display(), .to.display())]
    Place {
        /// Extracted directory
        from: PathBuf,
        /// Destination
        to: PathBuf,
        /// Copy failure
        reason: String,
    },
}

/// Supported archive formats, detected from the file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// `.tar.bz2`, `.tbz2`
    TarBz2,
    /// `.tar.gz`, `.tgz`
    TarGz,
    /// `.tar.zst`, `.tzst`
    TarZst,
    /// `.tar`
    Tar,
    /// `.zip`
    Zip,
}

/// Detect archive format from file extension
pub fn detect_format(path: &Path) -> Option<ArchiveFormat> {
    let name = path.to_string_lossy().to_lowercase();

    if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
        Some(ArchiveFormat::TarBz2)
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        Some(ArchiveFormat::TarGz)
    } else if name.ends_with(".tar.zst") || name.ends_with(".tzst") {
        Some(ArchiveFormat::TarZst)
    } else if name.ends_with(".tar") {
        Some(ArchiveFormat::Tar)
    } else if name.ends_with(".zip") {
        Some(ArchiveFormat::Zip)
    } else {
        None
    }
}

/// Extract an archive into `dest_dir`, auto-detecting format
///
/// # Errors
///
/// Returns [`ExtractError::UnsupportedFormat`] for unknown extensions and
/// [`ExtractError::Archive`] for corrupt input. Entries that would escape
/// `dest_dir` are not written.
pub fn extract_auto(archive_path: &Path, dest_dir: &Path) -> Result<(), ExtractError> {
    let format = detect_format(archive_path)
        .ok_or_else(|| ExtractError::UnsupportedFormat(archive_path.display().to_string()))?;

    fs::create_dir_all(dest_dir)?;
    let reader = BufReader::new(File::open(archive_path)?);

    match format {
        ArchiveFormat::TarBz2 => extract_tar(bzip2::read::BzDecoder::new(reader), dest_dir),
        ArchiveFormat::TarGz => extract_tar(flate2::read::GzDecoder::new(reader), dest_dir),
        ArchiveFormat::TarZst => extract_tar(ZstdDecoder::new(reader)?, dest_dir),
        ArchiveFormat::Tar => extract_tar(reader, dest_dir),
        ArchiveFormat::Zip => extract_zip(archive_path, dest_dir),
    }
}

fn extract_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<(), ExtractError> {
    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);

    for entry in archive.entries().map_err(archive_err)? {
        let mut entry = entry.map_err(archive_err)?;
        // unpack_in refuses paths that would land outside dest_dir
        if !entry.unpack_in(dest_dir).map_err(archive_err)? {
            tracing::warn!(
                path = %entry.path().map(|p| p.display().to_string()).unwrap_or_default(),
                "skipped archive entry outside destination"
            );
        }
    }
    Ok(())
}

fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<(), ExtractError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| ExtractError::Archive(e.to_string()))?;
    archive
        .extract(dest_dir)
        .map_err(|e| ExtractError::Archive(e.to_string()))
}

fn archive_err(e: io::Error) -> ExtractError {
    ExtractError::Archive(e.to_string())
}

/// The single directory directly under `dir`.
///
/// # Errors
///
/// Returns [`ExtractError::Layout`] when `dir` holds anything other than
/// exactly one entry that is a directory.
pub fn single_top_level(dir: &Path, archive: &str) -> Result<PathBuf, ExtractError> {
    let entries = fs::read_dir(dir)?
        .map(|e| e.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;

    match entries.as_slice() {
        [only] if only.is_dir() => Ok(only.clone()),
        _ => {
            let mut names: Vec<String> = entries
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect();
            names.sort();
            Err(ExtractError::Layout {
                archive: archive.to_string(),
                found: if names.is_empty() {
                    "nothing".to_string()
                } else {
                    names.join(", ")
                },
            })
        }
    }
}

/// Move an extracted directory to its final location.
///
/// Parent directories of `to` are created. A plain rename is tried first;
/// if that fails (e.g. across filesystems) the tree is moved by copy.
///
/// # Errors
///
/// Returns [`ExtractError::Place`] if neither strategy succeeds.
pub fn place(from: &Path, to: &Path) -> Result<(), ExtractError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }

    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            tracing::debug!(error = %rename_err, "rename failed, moving by copy");
            fs::create_dir_all(to)?;
            let mut options = fs_extra::dir::CopyOptions::new();
            options.content_only = true;
            fs_extra::dir::move_dir(from, to, &options)
                .map(|_| ())
                .map_err(|e| ExtractError::Place {
                    from: from.to_path_buf(),
                    to: to.to_path_buf(),
                    reason: e.to_string(),
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn tar_gz(path: &Path, files: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, content.as_bytes()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(
            detect_format(Path::new("samd-1.6.17.tar.bz2")),
            Some(ArchiveFormat::TarBz2)
        );
        assert_eq!(detect_format(Path::new("a.TGZ")), Some(ArchiveFormat::TarGz));
        assert_eq!(detect_format(Path::new("a.tar.zst")), Some(ArchiveFormat::TarZst));
        assert_eq!(detect_format(Path::new("a.tar")), Some(ArchiveFormat::Tar));
        assert_eq!(detect_format(Path::new("a.zip")), Some(ArchiveFormat::Zip));
        assert_eq!(detect_format(Path::new("a.dmg")), None);
    }

    #[test]
    fn test_extract_tar_gz_single_root() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("core.tar.gz");
        tar_gz(
            &archive,
            &[("samd/boards.txt", "zero.name=Zero\n"), ("samd/platform.txt", "name=SAMD\n")],
        );

        let out = dir.path().join("out");
        extract_auto(&archive, &out).unwrap();
        let root = single_top_level(&out, "core.tar.gz").unwrap();

        assert_eq!(root, out.join("samd"));
        assert_eq!(
            fs::read_to_string(root.join("boards.txt")).unwrap(),
            "zero.name=Zero\n"
        );
    }

    #[test]
    fn test_extract_tar_bz2() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("tool.tar.bz2");
        {
            let file = File::create(&archive).unwrap();
            let encoder = bzip2::write::BzEncoder::new(file, bzip2::Compression::default());
            let mut builder = tar::Builder::new(encoder);
            let mut header = tar::Header::new_gnu();
            header.set_size(2);
            header.set_mode(0o755);
            header.set_cksum();
            builder
                .append_data(&mut header, "bossac/bossac", &b"#!"[..])
                .unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }

        let out = dir.path().join("out");
        extract_auto(&archive, &out).unwrap();
        assert!(out.join("bossac/bossac").is_file());
    }

    #[test]
    fn test_extract_zip() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("tool.zip");
        {
            let file = File::create(&archive).unwrap();
            let mut zip = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("openocd/bin/openocd", options).unwrap();
            zip.write_all(b"elf").unwrap();
            zip.finish().unwrap();
        }

        let out = dir.path().join("out");
        extract_auto(&archive, &out).unwrap();
        assert_eq!(single_top_level(&out, "tool.zip").unwrap(), out.join("openocd"));
    }

    #[test]
    fn test_multiple_top_level_entries_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("messy.tar.gz");
        tar_gz(&archive, &[("a/x", "1"), ("b/y", "2")]);

        let out = dir.path().join("out");
        extract_auto(&archive, &out).unwrap();
        let err = single_top_level(&out, "messy.tar.gz").unwrap_err();
        match err {
            ExtractError::Layout { found, .. } => assert_eq!(found, "a, b"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_top_level_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("flat.tar.gz");
        tar_gz(&archive, &[("README", "hi")]);

        let out = dir.path().join("out");
        extract_auto(&archive, &out).unwrap();
        assert!(matches!(
            single_top_level(&out, "flat.tar.gz"),
            Err(ExtractError::Layout { .. })
        ));
    }

    #[test]
    fn test_empty_archive_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("empty.tar.gz");
        tar_gz(&archive, &[]);

        let out = dir.path().join("out");
        extract_auto(&archive, &out).unwrap();
        match single_top_level(&out, "empty.tar.gz").unwrap_err() {
            ExtractError::Layout { archive, found } => {
                assert_eq!(archive, "empty.tar.gz");
                assert_eq!(found, "nothing");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("installer.dmg");
        fs::write(&archive, b"x").unwrap();
        assert!(matches!(
            extract_auto(&archive, &dir.path().join("out")),
            Err(ExtractError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_corrupt_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("broken.tar.gz");
        fs::write(&archive, b"definitely not gzip").unwrap();
        assert!(extract_auto(&archive, &dir.path().join("out")).is_err());
    }

    #[test]
    fn test_place_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("staging/samd");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("boards.txt"), "x=1\n").unwrap();

        let dest = dir.path().join("arduino/hardware/samd/1.6.17");
        place(&src, &dest).unwrap();

        assert!(dest.join("boards.txt").is_file());
        assert!(!src.exists());
    }
}
