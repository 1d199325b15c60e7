// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::{Path, PathBuf};

use crate::action::Error;
use crate::builder;
use crate::manifest::metadata::Package;

/// Builds a `.pkrt` from `source_dir` into `output_dir`. This action has
/// no sysroot, no database, and no hooks; it is the builder pipeline
/// (§4.8) on its own.
pub fn create_package(pkg: &Package, source_dir: &Path, output_dir: &Path) -> Result<PathBuf, Error> {
    builder::create_package(pkg, source_dir, output_dir).map_err(Error::from)
}
