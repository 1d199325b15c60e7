// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::{Path, PathBuf};

use crate::action::{with_cache_dir, Error};
use crate::archive;
use crate::builder;
use crate::db;
use crate::fileops;
use crate::manifest::filelist::{self, FileEntry};
use crate::manifest::metadata;
use crate::passwd;

/// Reconstructs a `.reverseinstall.pkrt` from an installed package's
/// current on-disk files, in the order: copy sysroot files into a
/// staging tree, then run the builder pipeline over that tree.
///
/// The historical tool's own directory-setup here checked
/// `mkdir(files) != 0 && mkdir(info) != 0`, which only reports failure
/// when *both* creations fail; this implementation checks each
/// independently.
pub fn reverse_install(sysroot: &Path, id: &str, arch: &str, output_dir: &Path) -> Result<PathBuf, Error> {
    with_cache_dir(sysroot, |cache_dir| {
        let pkg = db::installed::load_package(sysroot, id, arch)?.ok_or_else(|| Error::NotInstalled(id.to_string()))?;
        let (filelist_buf, checksums_buf) = db::installed::get_files_info(sysroot, id, arch)?
            .ok_or_else(|| Error::NotInstalled(id.to_string()))?;
        let entries = filelist::parse(&filelist_buf);

        let files_dir = cache_dir.join("files");
        let info_dir = cache_dir.join("info");
        std::fs::create_dir_all(&files_dir).map_err(|e| Error::FileOps(fileops::Error::CreateDir(files_dir.clone(), e)))?;
        std::fs::create_dir_all(&info_dir).map_err(|e| Error::FileOps(fileops::Error::CreateDir(info_dir.clone(), e)))?;

        copy_from_sysroot(sysroot, &files_dir, &entries)?;

        std::fs::write(info_dir.join("filelist.txt"), &filelist_buf)
            .map_err(|e| Error::FileOps(fileops::Error::CreateDest(info_dir.join("filelist.txt"), e)))?;
        std::fs::write(info_dir.join("checksums.txt"), &checksums_buf)
            .map_err(|e| Error::FileOps(fileops::Error::CreateDest(info_dir.join("checksums.txt"), e)))?;
        std::fs::write(info_dir.join("metadata.txt"), metadata::emit(&pkg))
            .map_err(|e| Error::FileOps(fileops::Error::CreateDest(info_dir.join("metadata.txt"), e)))?;

        builder::verify_checksums(&checksums_buf, &entries, &files_dir)?;

        let output_file = output_dir.join(format!(
            "{}_{}-{}.{}.reverseinstall.pkrt",
            pkg.package_id, pkg.version_string, pkg.package_generation, pkg.arch
        ));
        archive::compress(cache_dir, &output_file)?;

        Ok(output_file)
    })
}

fn copy_from_sysroot(sysroot: &Path, files_dir: &Path, entries: &[FileEntry]) -> Result<(), Error> {
    for entry in entries {
        let source = sysroot.join(entry.path());
        let dest = files_dir.join(entry.path());
        let (uid, gid) = passwd::resolve(sysroot, entry.owner(), entry.group())?;
        let uid = uid.ok_or_else(|| Error::UnknownSysrootOwner(source.clone()))?;
        let gid = gid.ok_or_else(|| Error::UnknownSysrootOwner(source.clone()))?;

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
    Ok(())
}
