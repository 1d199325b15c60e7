// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! `<sysroot>/var/packrat/pkgdb/catalogs/catalog.<arch>.db`: one file per
//! `(repository, arch)`. The arch is encoded in the filename, never
//! stored redundantly as a row column — a row only gains its `arch` field
//! when a query assembles a [`CatalogEntry`] from a specific file.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use thiserror::Error;

use crate::checksum;

const SCHEMA: &str = "create table catalog (
    PackageID text not null,
    VersionString text not null,
    PackageGeneration integer not null,
    Description text not null,
    Dependencies text not null
)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub package_id: String,
    pub arch: String,
    pub version_string: String,
    pub package_generation: u64,
    pub description: String,
    pub dependencies: Vec<String>,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("open catalog database {0:?}")]
    Open(PathBuf, #[source] rusqlite::Error),
    #[error("create parent directory for {0:?}")]
    CreateDir(PathBuf, #[source] std::io::Error),
    #[error("catalog database query failed")]
    Query(#[source] rusqlite::Error),
    #[error("list catalogs directory {0:?}")]
    ListDir(PathBuf, #[source] std::io::Error),
    #[error(transparent)]
    Checksum(#[from] checksum::Error),
}

pub fn catalogs_dir(sysroot: &Path) -> PathBuf {
    sysroot.join("var/packrat/pkgdb/catalogs")
}

pub fn catalog_path(sysroot: &Path, arch: &str) -> PathBuf {
    catalogs_dir(sysroot).join(format!("catalog.{arch}.db"))
}

/// Extracts the arch component from a `catalog.<arch>.db` filename.
pub fn arch_from_path(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let rest = name.strip_prefix("catalog.")?;
    rest.strip_suffix(".db").map(str::to_string)
}

fn open(path: &Path) -> Result<Connection, Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::CreateDir(parent.to_path_buf(), e))?;
    }
    Connection::open(path).map_err(|e| Error::Open(path.to_path_buf(), e))
}

pub fn initialize_empty(path: &Path) -> Result<(), Error> {
    if path.exists() {
        std::fs::remove_file(path).map_err(|e| Error::CreateDir(path.to_path_buf(), e))?;
    }
    let conn = open(path)?;
    conn.execute(SCHEMA, []).map_err(Error::Query)?;
    Ok(())
}

pub fn add(path: &Path, entry: &CatalogEntry) -> Result<(), Error> {
    let conn = open(path)?;
    conn.execute(
        "insert into catalog (PackageID, VersionString, PackageGeneration, Description, Dependencies)
         values (?1, ?2, ?3, ?4, ?5)",
        params![
            entry.package_id,
            entry.version_string,
            entry.package_generation,
            entry.description,
            entry.dependencies.join("\n"),
        ],
    )
    .map_err(Error::Query)?;
    Ok(())
}

/// Searches one catalog file. `package_id = None` returns every row,
/// ordered by `PackageID`.
pub fn search(path: &Path, package_id: Option<&str>) -> Result<Vec<CatalogEntry>, Error> {
    let arch = arch_from_path(path).unwrap_or_default();
    let conn = open(path)?;

    let mut stmt = match package_id {
        Some(_) => conn
            .prepare("select PackageID, VersionString, PackageGeneration, Description, Dependencies from catalog where PackageID = ?1 order by PackageID")
            .map_err(Error::Query)?,
        None => conn
            .prepare("select PackageID, VersionString, PackageGeneration, Description, Dependencies from catalog order by PackageID")
            .map_err(Error::Query)?,
    };

    let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<CatalogEntry> {
        let dependencies: String = row.get(4)?;
        Ok(CatalogEntry {
            package_id: row.get(0)?,
            arch: arch.clone(),
            version_string: row.get(1)?,
            package_generation: row.get(2)?,
            description: row.get(3)?,
            dependencies: dependencies.lines().map(str::to_string).collect(),
        })
    };

    let rows = match package_id {
        Some(id) => stmt.query_map(params![id], map_row),
        None => stmt.query_map([], map_row),
    }
    .map_err(Error::Query)?;

    rows.collect::<Result<Vec<_>, _>>().map_err(Error::Query)
}

/// Searches every `catalog.<arch>.db` file under the catalogs directory
/// whose arch is in `supported_arches`.
pub fn search_all(sysroot: &Path, package_id: Option<&str>, supported_arches: &[String]) -> Result<Vec<CatalogEntry>, Error> {
    let dir = catalogs_dir(sysroot);
    if !dir.exists() {
        return Ok(vec![]);
    }

    let mut results = vec![];
    for entry in std::fs::read_dir(&dir).map_err(|e| Error::ListDir(dir.clone(), e))? {
        let entry = entry.map_err(|e| Error::ListDir(dir.clone(), e))?;
        let path = entry.path();
        let Some(arch) = arch_from_path(&path) else {
            continue;
        };
        if !supported_arches.iter().any(|a| a == &arch) {
            continue;
        }
        results.extend(search(&path, package_id)?);
    }
    Ok(results)
}

/// Compares the digest of `catalog_file` against the digest stored in its
/// `<catalog_file>.chksum` sidecar. `Ok(true)` means the local copy is
/// still fresh; fetching new bytes is left to the caller.
pub fn is_fresh(catalog_file: &Path) -> Result<bool, Error> {
    let sidecar = catalog_file.with_extension("db.chksum");
    if !catalog_file.exists() || !sidecar.exists() {
        return Ok(false);
    }
    let expected = std::fs::read_to_string(&sidecar)
        .map_err(|e| Error::ListDir(sidecar, e))?
        .trim()
        .to_string();
    let actual = checksum::digest_file(catalog_file)?;
    Ok(expected == actual)
}
