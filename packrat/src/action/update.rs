// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::Path;

use config::Config;

use crate::action::install::read_required;
use crate::action::{materialize, obsolete_files, remove_files, run_hook, with_cache_dir, Error};
use crate::archive;
use crate::builder;
use crate::db;
use crate::manifest::filelist;
use crate::manifest::metadata::{self, Package};

/// Updates the package already installed under `archive_path`'s
/// `(PackageID, Arch)` to the version carried by the archive. Files only
/// present in the old file list are removed (P4); files present in both
/// are overwritten.
pub fn update(sysroot: &Path, config: &Config, archive_path: &Path) -> Result<Package, Error> {
    with_cache_dir(sysroot, |cache_dir| {
        archive::extract(archive_path, cache_dir)?;

        let info_dir = cache_dir.join("info");
        let metadata_buf = read_required(&info_dir.join("metadata.txt"))?;
        let pkg = metadata::parse(&metadata_buf).map_err(|e| Error::PackageMalformed(e.to_string()))?;

        if !config.arch_supported(&pkg.arch) {
            return Err(Error::ArchUnsupported(pkg.arch.clone()));
        }

        let existing = db::installed::load_package(sysroot, &pkg.package_id, &pkg.arch)?
            .ok_or_else(|| Error::NotInstalled(pkg.identity()))?;

        if existing.version_string == pkg.version_string && existing.package_generation == pkg.package_generation {
            return Err(Error::AlreadyInstalled(pkg.identity()));
        }

        let checksums_buf = read_required(&info_dir.join("checksums.txt"))?;
        let filelist_buf = read_required(&info_dir.join("filelist.txt"))?;
        let new_entries = filelist::parse(&filelist_buf);

        builder::verify_checksums(&checksums_buf, &new_entries, &cache_dir.join("files"))?;

        run_hook(sysroot, "pre-update", pkg.hooks.pre_update.as_deref());

        materialize(sysroot, &cache_dir.join("files"), &new_entries)?;

        let (old_filelist_buf, _) = db::installed::get_files_info(sysroot, &pkg.package_id, &pkg.arch)?.unwrap_or_default();
        let old_entries = filelist::parse(&old_filelist_buf);
        let obsolete = obsolete_files(&old_entries, &new_entries);
        remove_files(sysroot, obsolete.into_iter());

        run_hook(sysroot, "post-update", pkg.hooks.post_update.as_deref());

        db::installed::save_package(sysroot, &pkg, &filelist_buf, &checksums_buf)
            .map_err(|e| Error::Critical(pkg.identity(), e))?;

        Ok(pkg)
    })
}
