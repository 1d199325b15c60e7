// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Relational state: the per-sysroot installed-package database and the
//! per-(repository, arch) catalog databases. Each call opens and closes
//! its own connection; no handle is held across operations (§5).

pub mod catalog;
pub mod installed;
