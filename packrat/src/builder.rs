// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Package construction (`CreatePackage`, §4.8) and checksum verification
//! (§4.1) shared by install/update/reverse-install.

use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::archive;
use crate::checksum;
use crate::fileops;
use crate::manifest::checksums::{self, ChecksumEntry};
use crate::manifest::filelist::{self, FileEntry};
use crate::manifest::metadata::{self, Package};
use crate::passwd;

#[derive(Debug, Error)]
pub enum Error {
    #[error("walk source directory {0:?}")]
    WalkDir(PathBuf, #[source] std::io::Error),
    #[error("unsupported file type at {0:?} (only regular files, directories, and symlinks are supported)")]
    UnsupportedFileType(PathBuf),
    #[error("resolve owner/group for {0:?}")]
    ResolveOwner(PathBuf, #[source] passwd::Error),
    #[error("no passwd/group entry on the build host for the owner of {0:?}")]
    UnknownOwner(PathBuf),
    #[error("create staging directory {0:?}")]
    CreateStaging(PathBuf, #[source] std::io::Error),
    #[error("write {0:?}")]
    WriteManifest(PathBuf, #[source] std::io::Error),
    #[error(transparent)]
    Checksum(#[from] checksum::Error),
    #[error(transparent)]
    FileOps(#[from] fileops::Error),
    #[error(transparent)]
    Archive(#[from] archive::Error),
    #[error("remove staging directory {0:?}")]
    RemoveStaging(PathBuf, #[source] std::io::Error),
    #[error("checksum mismatch for {path}: expected {expected}, found {actual}")]
    ChecksumMismatch { path: String, expected: String, actual: String },
    #[error("checksum entry for {0:?} has no matching file-list entry")]
    OrphanChecksum(String),
    #[error("required metadata field `{0}` is empty")]
    RequiredMetadataMissing(&'static str),
    #[error("source directory {0:?} does not exist")]
    SourceDirMissing(PathBuf),
}

/// Checks the §4.9 `CreatePackage` precondition: all required metadata
/// present, `source_dir` exists.
fn check_preconditions(pkg: &Package, source_dir: &Path) -> Result<(), Error> {
    if pkg.package_id.is_empty() {
        return Err(Error::RequiredMetadataMissing("PackageID"));
    }
    if pkg.arch.is_empty() {
        return Err(Error::RequiredMetadataMissing("Arch"));
    }
    if pkg.version_string.is_empty() {
        return Err(Error::RequiredMetadataMissing("VersionString"));
    }
    if !source_dir.is_dir() {
        return Err(Error::SourceDirMissing(source_dir.to_path_buf()));
    }
    Ok(())
}

/// Walks `source_dir` depth-first, directories before their contents,
/// resolving each entry's owner/group to names via the host passwd DB.
pub fn walk_source_dir(source_dir: &Path) -> Result<Vec<FileEntry>, Error> {
    let mut entries = vec![];
    walk(source_dir, source_dir, &mut entries)?;
    Ok(entries)
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<FileEntry>) -> Result<(), Error> {
    let mut children: Vec<_> = std::fs::read_dir(dir)
        .map_err(|e| Error::WalkDir(dir.to_path_buf(), e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| Error::WalkDir(dir.to_path_buf(), e))?;
    children.sort_by_key(|e| e.file_name());

    for child in children {
        let path = child.path();
        let meta = child.metadata().map_err(|e| Error::WalkDir(path.clone(), e))?;
        let relative = path.strip_prefix(root).unwrap_or(&path).to_string_lossy().to_string();
        let (owner, group) = owner_names(&path, &meta)?;
        let mode = meta.mode() & 0o7777;

        if meta.is_dir() {
            out.push(FileEntry::Directory {
                path: relative,
                owner,
                group,
                mode,
            });
            walk(root, &path, out)?;
        } else if meta.file_type().is_symlink() || meta.is_file() {
            out.push(FileEntry::File {
                path: relative,
                owner,
                group,
                mode,
            });
        } else {
            return Err(Error::UnsupportedFileType(path));
        }
    }
    Ok(())
}

fn owner_names(path: &Path, meta: &std::fs::Metadata) -> Result<(String, String), Error> {
    let owner = passwd::lookup_user_id(Path::new("/"), meta.uid())
        .map_err(|e| Error::ResolveOwner(path.to_path_buf(), e))?
        .map(|e| e.name)
        .ok_or_else(|| Error::UnknownOwner(path.to_path_buf()))?;
    let group = passwd::lookup_group_id(Path::new("/"), meta.gid())
        .map_err(|e| Error::ResolveOwner(path.to_path_buf(), e))?
        .map(|e| e.name)
        .ok_or_else(|| Error::UnknownOwner(path.to_path_buf()))?;
    Ok((owner, group))
}

/// Computes a checksum entry for every `File` entry in `entries`, reading
/// bytes under `source_dir`. Directories and symlinks are skipped.
pub fn compute_checksums(entries: &[FileEntry], source_dir: &Path) -> Result<Vec<ChecksumEntry>, Error> {
    let mut out = vec![];
    for entry in entries {
        if let FileEntry::File { path, .. } = entry {
            let full = source_dir.join(path);
            if full.symlink_metadata().map(|m| m.file_type().is_symlink()).unwrap_or(false) {
                continue;
            }
            out.push(ChecksumEntry {
                digest: checksum::digest_file(&full)?,
                path: path.clone(),
            });
        }
    }
    Ok(out)
}

/// Builds a `.pkrt` at `output_dir`, returning its path.
pub fn create_package(pkg: &Package, source_dir: &Path, output_dir: &Path) -> Result<PathBuf, Error> {
    check_preconditions(pkg, source_dir)?;

    let staging = output_dir.join(format!(
        "{}_{}-{}.{}",
        pkg.package_id, pkg.version_string, pkg.package_generation, pkg.arch
    ));
    let files_dir = staging.join("files");
    let info_dir = staging.join("info");
    std::fs::create_dir_all(&files_dir).map_err(|e| Error::CreateStaging(files_dir.clone(), e))?;
    std::fs::create_dir_all(&info_dir).map_err(|e| Error::CreateStaging(info_dir.clone(), e))?;

    let entries = walk_source_dir(source_dir)?;
    let checksum_entries = compute_checksums(&entries, source_dir)?;

    std::fs::write(info_dir.join("filelist.txt"), filelist::emit(&entries))
        .map_err(|e| Error::WriteManifest(info_dir.join("filelist.txt"), e))?;
    std::fs::write(info_dir.join("checksums.txt"), checksums::emit(&checksum_entries))
        .map_err(|e| Error::WriteManifest(info_dir.join("checksums.txt"), e))?;
    std::fs::write(info_dir.join("metadata.txt"), metadata::emit(pkg))
        .map_err(|e| Error::WriteManifest(info_dir.join("metadata.txt"), e))?;

    for entry in &entries {
        let source = source_dir.join(entry.path());
        let dest = files_dir.join(entry.path());

        let (uid, gid) = passwd::resolve(Path::new("/"), entry.owner(), entry.group())
            .map_err(|e| Error::ResolveOwner(source.clone(), e))?;
        let uid = uid.ok_or_else(|| Error::UnknownOwner(source.clone()))?;
        let gid = gid.ok_or_else(|| Error::UnknownOwner(source.clone()))?;

        match entry {
            FileEntry::Directory { mode, .. } => {
                fileops::create_dir(&dest, uid, gid, *mode)?;
            }
            FileEntry::File { mode, .. } => {
                if source.symlink_metadata().map(|m| m.file_type().is_symlink()).unwrap_or(false) {
                    fileops::copy_symlink(&source, &dest, uid, gid, true)?;
                } else {
                    fileops::copy_file(&source, &dest, uid, gid, *mode, true)?;
                }
            }
        }
    }

    let output_file = output_dir.join(format!(
        "{}_{}-{}.{}.pkrt",
        pkg.package_id, pkg.version_string, pkg.package_generation, pkg.arch
    ));
    archive::compress(&staging, &output_file)?;
    std::fs::remove_dir_all(&staging).map_err(|e| Error::RemoveStaging(staging.clone(), e))?;

    Ok(output_file)
}

/// Verifies every entry in `checksum_buf` against files under `files_dir`,
/// failing fast on the first mismatch. Also enforces that every checksum
/// entry's path has a matching `File` entry in `entries` (I3) — a
/// checksum for a path absent from the file list is rejected as
/// `OrphanChecksum` before its digest is ever read.
pub fn verify_checksums(checksum_buf: &str, entries: &[FileEntry], files_dir: &Path) -> Result<(), Error> {
    for entry in checksums::parse(checksum_buf) {
        if !entries.iter().any(|e| matches!(e, FileEntry::File { .. }) && e.path() == entry.path) {
            return Err(Error::OrphanChecksum(entry.path));
        }

        let path = files_dir.join(&entry.path);
        let actual = checksum::digest_file(&path)?;
        if actual != entry.digest {
            return Err(Error::ChecksumMismatch {
                path: entry.path,
                expected: entry.digest,
                actual,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn file_entry(path: &str) -> FileEntry {
        FileEntry::File {
            path: path.to_string(),
            owner: "root".into(),
            group: "root".into(),
            mode: 0o644,
        }
    }

    #[test]
    fn verify_checksums_fails_fast_on_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), b"hello").unwrap();
        let digest = checksum::digest_file(&dir.path().join("a")).unwrap();
        let entries = [file_entry("a")];

        assert!(verify_checksums(&format!("{digest} a\n"), &entries, dir.path()).is_ok());
        assert!(matches!(
            verify_checksums("0000000000000000000000000000000000000 a\n", &entries, dir.path()),
            Err(Error::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn verify_checksums_rejects_checksum_with_no_filelist_entry() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), b"hello").unwrap();
        let digest = checksum::digest_file(&dir.path().join("a")).unwrap();

        // "a" has a checksum entry but no matching File entry in the list.
        let entries: [FileEntry; 0] = [];
        assert!(matches!(
            verify_checksums(&format!("{digest} a\n"), &entries, dir.path()),
            Err(Error::OrphanChecksum(path)) if path == "a"
        ));
    }

    #[test]
    fn create_package_rejects_empty_required_metadata() {
        let source = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let mut pkg = Package {
            package_id: "hello".into(),
            arch: "noarch".into(),
            version_string: "1.0".into(),
            package_generation: 1,
            description: "greeting".into(),
            hooks: Default::default(),
        };
        pkg.package_id = String::new();

        assert!(matches!(
            create_package(&pkg, source.path(), output.path()),
            Err(Error::RequiredMetadataMissing("PackageID"))
        ));
    }

    #[test]
    fn create_package_rejects_missing_source_dir() {
        let output = tempfile::tempdir().unwrap();
        let pkg = Package {
            package_id: "hello".into(),
            arch: "noarch".into(),
            version_string: "1.0".into(),
            package_generation: 1,
            description: "greeting".into(),
            hooks: Default::default(),
        };

        assert!(matches!(
            create_package(&pkg, Path::new("/nonexistent/source/dir"), output.path()),
            Err(Error::SourceDirMissing(_))
        ));
    }

    #[test]
    fn create_package_produces_archive_with_manifest() {
        let source = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(source.path().join("usr/bin")).unwrap();
        std::fs::write(source.path().join("usr/bin/hello"), b"#!/bin/sh\necho hi\n").unwrap();

        let output = tempfile::tempdir().unwrap();
        let pkg = Package {
            package_id: "hello".into(),
            arch: "noarch".into(),
            version_string: "1.0".into(),
            package_generation: 1,
            description: "greeting".into(),
            hooks: Default::default(),
        };

        let archive_path = create_package(&pkg, source.path(), output.path()).unwrap();
        assert!(archive_path.exists());
        assert_eq!(archive_path.file_name().unwrap(), "hello_1.0-1.noarch.pkrt");

        let extracted = tempfile::tempdir().unwrap();
        archive::extract(&archive_path, extracted.path()).unwrap();
        let metadata_text = std::fs::read_to_string(extracted.path().join("info/metadata.txt")).unwrap();
        assert!(metadata_text.contains("PackageID=hello"));
    }
}
