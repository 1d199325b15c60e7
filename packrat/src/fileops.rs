// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Primitive filesystem operations used by the materializer: create a
//! directory, copy a file, copy a symlink. Each takes an explicit owner,
//! group, and mode rather than inheriting them from the environment.

use std::io::{Read, Write};
use std::os::unix::fs::symlink;
use std::path::Path;

use nix::errno::Errno;
use nix::sys::stat::{fchmod, Mode};
use nix::unistd::{fchownat, FchownatFlags, Gid, Uid};
use thiserror::Error;

const COPY_CHUNK: usize = 5 * 1024 * 1024;
const DEFAULT_DIR_MODE: u32 = 0o755;

#[derive(Debug, Error)]
pub enum Error {
    #[error("create directory {0:?}")]
    CreateDir(std::path::PathBuf, #[source] std::io::Error),
    #[error("destination {0:?} exists and is not a directory")]
    NotADirectory(std::path::PathBuf),
    #[error("destination {0:?} exists; refusing to overwrite")]
    AlreadyExists(std::path::PathBuf),
    #[error("remove existing destination {0:?}")]
    RemoveExisting(std::path::PathBuf, #[source] std::io::Error),
    #[error("open source {0:?}")]
    OpenSource(std::path::PathBuf, #[source] std::io::Error),
    #[error("create destination {0:?}")]
    CreateDest(std::path::PathBuf, #[source] std::io::Error),
    #[error("copy bytes into {0:?}")]
    CopyBytes(std::path::PathBuf, #[source] std::io::Error),
    #[error("stat source {0:?}")]
    StatSource(std::path::PathBuf, #[source] std::io::Error),
    #[error("read link {0:?}")]
    ReadLink(std::path::PathBuf, #[source] std::io::Error),
    #[error("create symlink {0:?}")]
    Symlink(std::path::PathBuf, #[source] std::io::Error),
    #[error("chown {0:?}")]
    Chown(std::path::PathBuf, #[source] Errno),
    #[error("chmod {0:?}")]
    Chmod(std::path::PathBuf, #[source] Errno),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirOutcome {
    Created,
    AlreadyExisted,
}

/// Creates `path` with `mode`, or if it already exists, updates its
/// ownership and mode in place. Either way this is not fatal to the caller.
pub fn create_dir(path: &Path, uid: Uid, gid: Gid, mode: u32) -> Result<DirOutcome, Error> {
    if path.exists() {
        if !path.is_dir() {
            return Err(Error::NotADirectory(path.to_path_buf()));
        }
        chown_path(path, uid, gid)?;
        chmod_path(path, mode)?;
        return Ok(DirOutcome::AlreadyExisted);
    }

    std::fs::create_dir(path).map_err(|e| Error::CreateDir(path.to_path_buf(), e))?;
    chown_path(path, uid, gid)?;
    chmod_path(path, mode)?;
    Ok(DirOutcome::Created)
}

/// Ensures every parent of `path` exists, then applies ownership and mode
/// to `path` itself only.
pub fn recursive_mkdir(path: &Path, uid: Uid, gid: Gid, mode: Option<u32>) -> Result<(), Error> {
    std::fs::create_dir_all(path).map_err(|e| Error::CreateDir(path.to_path_buf(), e))?;
    chown_path(path, uid, gid)?;
    chmod_path(path, mode.unwrap_or(DEFAULT_DIR_MODE))?;
    Ok(())
}

/// Copies a regular file from `source` to `dest`, applying `mode` and
/// ownership to the new file. Refuses to clobber an existing destination
/// unless `overwrite` is set.
pub fn copy_file(source: &Path, dest: &Path, uid: Uid, gid: Gid, mode: u32, overwrite: bool) -> Result<(), Error> {
    if dest.exists() {
        if !overwrite {
            return Err(Error::AlreadyExists(dest.to_path_buf()));
        }
        remove_existing(dest)?;
    }

    let mut src = fs_err::File::open(source).map_err(|e| Error::OpenSource(source.to_path_buf(), e))?;
    let mut out = fs_err::File::create(dest).map_err(|e| Error::CreateDest(dest.to_path_buf(), e))?;

    let mut buf = vec![0u8; COPY_CHUNK];
    loop {
        let read = src.read(&mut buf).map_err(|e| Error::CopyBytes(dest.to_path_buf(), e))?;
        if read == 0 {
            break;
        }
        out.write_all(&buf[..read])
            .map_err(|e| Error::CopyBytes(dest.to_path_buf(), e))?;
    }
    drop(src);
    drop(out);

    // The destination is guaranteed to be a fresh regular file here (any
    // symlink in its place was already removed above), so a following
    // chown is correct.
    chown_path(dest, uid, gid)?;
    chmod_path(dest, mode)?;
    Ok(())
}

/// Recreates `source`'s symlink target at `dest`, chowning the link itself.
pub fn copy_symlink(source: &Path, dest: &Path, uid: Uid, gid: Gid, overwrite: bool) -> Result<(), Error> {
    let target = std::fs::read_link(source).map_err(|e| Error::ReadLink(source.to_path_buf(), e))?;

    if dest.exists() || dest.symlink_metadata().is_ok() {
        if !overwrite {
            return Err(Error::AlreadyExists(dest.to_path_buf()));
        }
        remove_existing(dest)?;
    }

    symlink(&target, dest).map_err(|e| Error::Symlink(dest.to_path_buf(), e))?;

    fchownat(None, dest, Some(uid), Some(gid), FchownatFlags::NoFollowSymlink)
        .map_err(|e| Error::Chown(dest.to_path_buf(), e))?;
    Ok(())
}

fn remove_existing(path: &Path) -> Result<(), Error> {
    let is_dir = path.symlink_metadata().map(|m| m.is_dir()).unwrap_or(false);
    if is_dir {
        std::fs::remove_dir(path).map_err(|e| Error::RemoveExisting(path.to_path_buf(), e))
    } else {
        std::fs::remove_file(path).map_err(|e| Error::RemoveExisting(path.to_path_buf(), e))
    }
}

fn chown_path(path: &Path, uid: Uid, gid: Gid) -> Result<(), Error> {
    fchownat(None, path, Some(uid), Some(gid), FchownatFlags::FollowSymlink)
        .map_err(|e| Error::Chown(path.to_path_buf(), e))
}

fn chmod_path(path: &Path, mode: u32) -> Result<(), Error> {
    let file = fs_err::File::open(path).map_err(|e| Error::CreateDest(path.to_path_buf(), e))?;
    fchmod(std::os::unix::io::AsRawFd::as_raw_fd(&file), Mode::from_bits_truncate(mode))
        .map_err(|e| Error::Chmod(path.to_path_buf(), e))
}
