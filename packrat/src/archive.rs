// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! `.pkrt` archive handling: extraction into a scratch directory,
//! compression of a staging tree, and the lifecycle of the per-run cache
//! directory under `<sysroot>/var/packrat/cache/`.
//!
//! The container format is a zstd-compressed tar stream. The original
//! tool's own sources disagree between a tar-extraction path and a
//! squashfs-mount path across iterations; this implementation commits to
//! tar+zstd (see DESIGN.md).

use std::io::{self};
use std::path::{Path, PathBuf};

use nix::sys::stat::{fchmod, Mode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("open archive {0:?}")]
    OpenArchive(PathBuf, #[source] io::Error),
    #[error("extract archive {0:?}")]
    Extract(PathBuf, #[source] io::Error),
    #[error("create output archive {0:?}")]
    CreateArchive(PathBuf, #[source] io::Error),
    #[error("append staging tree to archive")]
    Append(#[source] io::Error),
    #[error("finish archive compression")]
    Finish(#[source] io::Error),
    #[error("create cache directory under {0:?}")]
    CreateCacheDir(PathBuf, #[source] io::Error),
    #[error("set cache directory mode")]
    Chmod(#[source] nix::errno::Errno),
    #[error("remove cache directory {0:?}")]
    RemoveCacheDir(PathBuf, #[source] io::Error),
}

/// Unpacks `archive` (zstd-compressed tar) into `dest_dir`, which must
/// already exist.
pub fn extract(archive: &Path, dest_dir: &Path) -> Result<(), Error> {
    let file = fs_err::File::open(archive).map_err(|e| Error::OpenArchive(archive.to_path_buf(), e))?;
    let decoder = zstd::Decoder::new(file).map_err(|e| Error::Extract(archive.to_path_buf(), e))?;
    let mut tar = tar::Archive::new(decoder);
    tar.unpack(dest_dir).map_err(|e| Error::Extract(archive.to_path_buf(), e))?;
    Ok(())
}

/// Compresses the full tree rooted at `staging_dir` into a single `out_file`.
pub fn compress(staging_dir: &Path, out_file: &Path) -> Result<(), Error> {
    let file = fs_err::File::create(out_file).map_err(|e| Error::CreateArchive(out_file.to_path_buf(), e))?;
    let encoder = zstd::Encoder::new(file, 0).map_err(|e| Error::CreateArchive(out_file.to_path_buf(), e))?;
    let mut builder = tar::Builder::new(encoder);
    builder.append_dir_all(".", staging_dir).map_err(Error::Append)?;
    let encoder = builder.into_inner().map_err(Error::Append)?;
    encoder.finish().map_err(Error::Finish)?;
    Ok(())
}

/// Creates a fresh `0700` scratch directory under
/// `<sysroot>/var/packrat/cache/`, with an unguessable name.
pub fn create_temp_cache_dir(sysroot: &Path) -> Result<PathBuf, Error> {
    let base = sysroot.join("var/packrat/cache");
    std::fs::create_dir_all(&base).map_err(|e| Error::CreateCacheDir(base.clone(), e))?;

    let dir = tempfile::Builder::new()
        .prefix("packrat_cache_")
        .tempdir_in(&base)
        .map_err(|e| Error::CreateCacheDir(base.clone(), e))?
        .into_path();

    let handle = fs_err::File::open(&dir).map_err(|e| Error::CreateCacheDir(dir.clone(), e))?;
    fchmod(std::os::unix::io::AsRawFd::as_raw_fd(&handle), Mode::from_bits_truncate(0o700)).map_err(Error::Chmod)?;

    Ok(dir)
}

/// Removes a cache directory created by [`create_temp_cache_dir`]. Errors
/// here are reported but never fatal to the caller's primary outcome.
pub fn delete_temp_cache_dir(path: &Path) -> Result<(), Error> {
    if path.exists() {
        std::fs::remove_dir_all(path).map_err(|e| Error::RemoveCacheDir(path.to_path_buf(), e))?;
    }
    Ok(())
}
