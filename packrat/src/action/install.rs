// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::Path;

use config::Config;

use crate::action::{materialize, run_hook, with_cache_dir, Error};
use crate::archive;
use crate::builder;
use crate::db;
use crate::manifest::{filelist, metadata};
use crate::manifest::metadata::Package;

/// Installs `archive_path` into `sysroot`. Fails if the package's
/// `(PackageID, Arch)` is already installed, or its arch is unsupported.
pub fn install(sysroot: &Path, config: &Config, archive_path: &Path) -> Result<Package, Error> {
    with_cache_dir(sysroot, |cache_dir| {
        archive::extract(archive_path, cache_dir)?;

        let info_dir = cache_dir.join("info");
        let metadata_buf = read_required(&info_dir.join("metadata.txt"))?;
        let pkg = metadata::parse(&metadata_buf).map_err(|e| Error::PackageMalformed(e.to_string()))?;

        if !config.arch_supported(&pkg.arch) {
            return Err(Error::ArchUnsupported(pkg.arch.clone()));
        }
        if db::installed::load_package(sysroot, &pkg.package_id, &pkg.arch)?.is_some() {
            return Err(Error::AlreadyInstalled(pkg.identity()));
        }

        let checksums_buf = read_required(&info_dir.join("checksums.txt"))?;
        let filelist_buf = read_required(&info_dir.join("filelist.txt"))?;
        let entries = filelist::parse(&filelist_buf);

        builder::verify_checksums(&checksums_buf, &entries, &cache_dir.join("files"))?;

        run_hook(sysroot, "pre-install", pkg.hooks.pre_install.as_deref());

        materialize(sysroot, &cache_dir.join("files"), &entries)?;

        run_hook(sysroot, "post-install", pkg.hooks.post_install.as_deref());

        db::installed::save_package(sysroot, &pkg, &filelist_buf, &checksums_buf)
            .map_err(|e| Error::Critical(pkg.identity(), e))?;

        Ok(pkg)
    })
}

pub(crate) fn read_required(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path).map_err(|_| Error::PackageMalformed(format!("missing or unreadable {path:?}")))
}
