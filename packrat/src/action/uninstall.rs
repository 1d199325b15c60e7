// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::Path;

use crate::action::{remove_files, run_hook, Error};
use crate::db;
use crate::manifest::filelist;

/// Removes an installed package. If `arch` is `None` and more than one
/// architecture of `id` is installed, fails with `AmbiguousPackage` (P6).
pub fn uninstall(sysroot: &Path, id: &str, arch: Option<&str>) -> Result<(), Error> {
    let arch = match arch {
        Some(arch) => arch.to_string(),
        None => {
            if db::installed::has_multi_arches(sysroot, id)? {
                return Err(Error::AmbiguousPackage(id.to_string()));
            }
            db::installed::find_single_arch(sysroot, id)?.ok_or_else(|| Error::NotInstalled(id.to_string()))?
        }
    };

    let pkg = db::installed::load_package(sysroot, id, &arch)?.ok_or_else(|| Error::NotInstalled(id.to_string()))?;
    let (filelist_buf, _) = db::installed::get_files_info(sysroot, id, &arch)?.unwrap_or_default();
    let entries = filelist::parse(&filelist_buf);

    run_hook(sysroot, "pre-uninstall", pkg.hooks.pre_uninstall.as_deref());

    remove_files(sysroot, entries.iter());

    run_hook(sysroot, "post-uninstall", pkg.hooks.post_uninstall.as_deref());

    db::installed::delete_package(sysroot, id, &arch).map_err(|e| Error::Critical(pkg.identity(), e))?;

    Ok(())
}
