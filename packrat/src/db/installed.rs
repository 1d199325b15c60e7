// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! `<sysroot>/var/packrat/pkgdb/installed.db`: one row per installed
//! `(PackageID, Arch)` pair, carrying its metadata, hook commands, and
//! the full text of its file list and checksum list.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use crate::manifest::metadata::{Hooks, Package};

const SCHEMA: &str = "create table installed (
    PackageID text not null,
    Arch text not null,
    VersionString text not null,
    PackageGeneration integer not null,
    Description text not null,
    PreInstall text,
    PostInstall text,
    PreUninstall text,
    PostUninstall text,
    PreUpdate text,
    PostUpdate text,
    FileList text not null,
    Checksums text not null,
    primary key (PackageID, Arch)
)";

#[derive(Debug, Error)]
pub enum Error {
    #[error("open installed database {0:?}")]
    Open(PathBuf, #[source] rusqlite::Error),
    #[error("create parent directory for {0:?}")]
    CreateDir(PathBuf, #[source] std::io::Error),
    #[error("remove stale database {0:?}")]
    RemoveStale(PathBuf, #[source] std::io::Error),
    #[error("installed database query failed")]
    Query(#[source] rusqlite::Error),
}

pub fn path(sysroot: &Path) -> PathBuf {
    sysroot.join("var/packrat/pkgdb/installed.db")
}

fn open(sysroot: &Path) -> Result<Connection, Error> {
    let db_path = path(sysroot);
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::CreateDir(parent.to_path_buf(), e))?;
    }
    Connection::open(&db_path).map_err(|e| Error::Open(db_path, e))
}

/// Truncates and recreates the schema.
pub fn initialize_empty(sysroot: &Path) -> Result<(), Error> {
    let db_path = path(sysroot);
    if db_path.exists() {
        std::fs::remove_file(&db_path).map_err(|e| Error::RemoveStale(db_path.clone(), e))?;
    }
    let conn = open(sysroot)?;
    conn.execute(SCHEMA, []).map_err(Error::Query)?;
    Ok(())
}

/// Inserts or replaces the row for `pkg`'s `(PackageID, Arch)`, slurping
/// the file-list and checksum buffers verbatim into text columns.
pub fn save_package(sysroot: &Path, pkg: &Package, file_list: &str, checksums: &str) -> Result<(), Error> {
    let conn = open(sysroot)?;
    conn.execute(
        "insert or replace into installed
            (PackageID, Arch, VersionString, PackageGeneration, Description,
             PreInstall, PostInstall, PreUninstall, PostUninstall, PreUpdate, PostUpdate,
             FileList, Checksums)
         values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            pkg.package_id,
            pkg.arch,
            pkg.version_string,
            pkg.package_generation,
            pkg.description,
            pkg.hooks.pre_install,
            pkg.hooks.post_install,
            pkg.hooks.pre_uninstall,
            pkg.hooks.post_uninstall,
            pkg.hooks.pre_update,
            pkg.hooks.post_update,
            file_list,
            checksums,
        ],
    )
    .map_err(Error::Query)?;
    Ok(())
}

/// Loads metadata and hooks (not the file-list/checksum blobs) for
/// `(id, arch)`.
pub fn load_package(sysroot: &Path, id: &str, arch: &str) -> Result<Option<Package>, Error> {
    let conn = open(sysroot)?;
    conn.query_row(
        "select PackageID, Arch, VersionString, PackageGeneration, Description,
                PreInstall, PostInstall, PreUninstall, PostUninstall, PreUpdate, PostUpdate
         from installed where PackageID = ?1 and Arch = ?2",
        params![id, arch],
        |row| {
            Ok(Package {
                package_id: row.get(0)?,
                arch: row.get(1)?,
                version_string: row.get(2)?,
                package_generation: row.get(3)?,
                description: row.get(4)?,
                hooks: Hooks {
                    pre_install: row.get(5)?,
                    post_install: row.get(6)?,
                    pre_uninstall: row.get(7)?,
                    post_uninstall: row.get(8)?,
                    pre_update: row.get(9)?,
                    post_update: row.get(10)?,
                },
            })
        },
    )
    .optional()
    .map_err(Error::Query)
}

/// Loads the file-list and checksum blobs for `(id, arch)`.
pub fn get_files_info(sysroot: &Path, id: &str, arch: &str) -> Result<Option<(String, String)>, Error> {
    let conn = open(sysroot)?;
    conn.query_row(
        "select FileList, Checksums from installed where PackageID = ?1 and Arch = ?2",
        params![id, arch],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
    .map_err(Error::Query)
}

pub fn delete_package(sysroot: &Path, id: &str, arch: &str) -> Result<(), Error> {
    let conn = open(sysroot)?;
    conn.execute(
        "delete from installed where PackageID = ?1 and Arch = ?2",
        params![id, arch],
    )
    .map_err(Error::Query)?;
    Ok(())
}

/// True iff two or more rows share `PackageID`, mirroring the historical
/// tool's early-exit-on-second-row check via `limit 2` rather than a full
/// `count(*)` scan.
pub fn has_multi_arches(sysroot: &Path, id: &str) -> Result<bool, Error> {
    let conn = open(sysroot)?;
    let mut stmt = conn
        .prepare("select Arch from installed where PackageID = ?1 limit 2")
        .map_err(Error::Query)?;
    let count = stmt.query_map(params![id], |_| Ok(())).map_err(Error::Query)?.count();
    Ok(count >= 2)
}

/// The single arch a `PackageID` is installed under, when unambiguous.
pub fn find_single_arch(sysroot: &Path, id: &str) -> Result<Option<String>, Error> {
    let conn = open(sysroot)?;
    conn.query_row("select Arch from installed where PackageID = ?1 limit 1", params![id], |row| row.get(0))
        .optional()
        .map_err(Error::Query)
}
