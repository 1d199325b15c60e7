// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The five action state machines (§4.9): install, update, uninstall,
//! reverse-install, create-package. Each non-`create_package` action
//! shares the skeleton:
//!
//! ```text
//! Load config -> Open DB -> Mount/Extract -> Read metadata
//!   -> Precondition checks -> Verify checksums -> Pre-hook
//!   -> Materialize files -> Post-hook -> Commit DB -> Teardown
//! ```
//!
//! Teardown always runs, on every exit path; failures there are logged,
//! never propagated (§7).

pub mod create_package;
pub mod install;
pub mod reverse_install;
pub mod uninstall;
pub mod update;

use std::path::Path;

use thiserror::Error;

use crate::{archive, builder, db, fileops, passwd};
use crate::manifest::filelist::FileEntry;

pub use create_package::create_package;
pub use install::install;
pub use reverse_install::reverse_install;
pub use uninstall::uninstall;
pub use update::update;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] config::Error),
    #[error(transparent)]
    Archive(#[from] archive::Error),
    #[error(transparent)]
    Builder(#[from] builder::Error),
    #[error(transparent)]
    FileOps(#[from] fileops::Error),
    #[error(transparent)]
    Passwd(#[from] passwd::Error),
    #[error(transparent)]
    Db(#[from] db::installed::Error),
    #[error("arch `{0}` is not supported by this sysroot")]
    ArchUnsupported(String),
    #[error("package `{0}` is already installed")]
    AlreadyInstalled(String),
    #[error("package `{0}` is not installed")]
    NotInstalled(String),
    #[error("multiple architectures of `{0}` are installed; specify an arch")]
    AmbiguousPackage(String),
    #[error("package is malformed: {0}")]
    PackageMalformed(String),
    #[error("commit to the installed database failed after `{0}` was already materialized on disk; manual intervention is required")]
    Critical(String, #[source] db::installed::Error),
    #[error("could not resolve owner/group for {0:?} against the sysroot passwd database")]
    UnknownSysrootOwner(std::path::PathBuf),
}

/// Creates the per-run cache directory, runs `body`, then always tears
/// it down. Teardown errors are logged and swallowed (§7, P7).
pub fn with_cache_dir<T>(sysroot: &Path, body: impl FnOnce(&Path) -> Result<T, Error>) -> Result<T, Error> {
    let cache_dir = archive::create_temp_cache_dir(sysroot)?;
    let result = body(&cache_dir);
    if let Err(e) = archive::delete_temp_cache_dir(&cache_dir) {
        log::warn!("teardown: failed to remove cache directory {cache_dir:?}: {e}");
    }
    result
}

/// Runs a lifecycle hook if present. A non-zero exit is a warning, never
/// fatal (§4.9, §7) — grounded in the fork+chroot+`sh -c` contract of the
/// historical tool's hook execution.
pub fn run_hook(sysroot: &Path, phase: &str, command: Option<&str>) {
    let Some(command) = command else {
        return;
    };
    log::debug!("running {phase} hook");
    let container = container::Container::new(sysroot).work_dir("/");
    match container.run(command) {
        Ok(0) => {}
        Ok(code) => log::warn!("{phase} hook exited with status {code}: `{command}`"),
        Err(e) => log::warn!("{phase} hook could not be run: {e}"),
    }
}

/// Copies every entry in `entries` from `staging_files_dir` into
/// `sysroot`, resolving owner/group names against the *sysroot's* passwd
/// database, overwriting existing files (install semantics).
pub fn materialize(sysroot: &Path, staging_files_dir: &Path, entries: &[FileEntry]) -> Result<(), Error> {
    for entry in entries {
        let dest = sysroot.join(entry.path());
        let (uid, gid) = passwd::resolve(sysroot, entry.owner(), entry.group())?;
        let uid = uid.ok_or_else(|| Error::UnknownSysrootOwner(dest.clone()))?;
        let gid = gid.ok_or_else(|| Error::UnknownSysrootOwner(dest.clone()))?;

        match entry {
            FileEntry::Directory { mode, .. } => {
                fileops::create_dir(&dest, uid, gid, *mode)?;
            }
            FileEntry::File { mode, .. } => {
                let source = staging_files_dir.join(entry.path());
                if source.symlink_metadata().map(|m| m.file_type().is_symlink()).unwrap_or(false) {
                    fileops::copy_symlink(&source, &dest, uid, gid, true)?;
                } else {
                    fileops::copy_file(&source, &dest, uid, gid, *mode, true)?;
                }
            }
        }
    }
    Ok(())
}

/// Removes every regular-file entry's path from `sysroot`; directories
/// are left in place since they may be shared. Failures to unlink are
/// warnings, matching uninstall's non-fatal removal semantics (§4.9).
pub fn remove_files<'a>(sysroot: &Path, entries: impl IntoIterator<Item = &'a FileEntry>) {
    for entry in entries {
        if let FileEntry::File { path, .. } = entry {
            let target = sysroot.join(path);
            if target.symlink_metadata().is_ok() {
                if let Err(e) = std::fs::remove_file(&target) {
                    log::warn!("failed to remove {target:?}: {e}");
                }
            }
        }
    }
}

/// The set-difference step of update (§4.9, P4): paths only present in
/// the old file list are deleted from the sysroot. Comparison is by
/// relative path only; directory entries are never candidates.
pub fn obsolete_files<'a>(old: &'a [FileEntry], new: &[FileEntry]) -> Vec<&'a FileEntry> {
    old.iter()
        .filter(|e| matches!(e, FileEntry::File { .. }))
        .filter(|e| !new.iter().any(|n| n.path() == e.path()))
        .collect()
}

