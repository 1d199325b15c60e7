// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Loader for `<sysroot>/etc/packrat.conf`.
//!
//! The file format is a flat `Key=Value` list, one entry per line. `Arch=`
//! may repeat; a value prefixed with `@` marks the primary architecture.
//! `noarch` is always implicitly supported regardless of what the file
//! declares.

use std::path::{Path, PathBuf};

use thiserror::Error;

pub const NOARCH: &str = "noarch";

#[derive(Debug, Clone)]
pub struct Config {
    pub supported_arches: Vec<String>,
    pub primary_arch: String,
    pub os_release: String,
}

impl Config {
    pub fn arch_supported(&self, arch: &str) -> bool {
        arch == NOARCH || self.supported_arches.iter().any(|a| a == arch)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("config file missing: {0:?}")]
    Missing(PathBuf),
    #[error("read config file {0:?}")]
    Read(PathBuf, #[source] std::io::Error),
    #[error("no primary architecture declared (expected one `Arch=` line prefixed with `@`)")]
    NoPrimaryArch,
}

/// Load `<sysroot>/etc/packrat.conf`.
pub fn load(sysroot: &Path) -> Result<Config, Error> {
    let path = sysroot.join("etc/packrat.conf");

    if !path.exists() {
        return Err(Error::Missing(path));
    }

    let contents = fs_err::read_to_string(&path).map_err(|e| Error::Read(path.clone(), e))?;

    let mut supported_arches = vec![];
    let mut primary_arch = None;
    let mut os_release = String::new();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };

        match key.trim() {
            "Arch" => {
                let value = value.trim();
                if let Some(name) = value.strip_prefix('@') {
                    primary_arch = Some(name.to_string());
                    supported_arches.push(name.to_string());
                } else {
                    supported_arches.push(value.to_string());
                }
            }
            "OSRelease" => os_release = value.trim().to_string(),
            _ => continue,
        }
    }

    if !supported_arches.iter().any(|a| a == NOARCH) {
        supported_arches.push(NOARCH.to_string());
    }

    let primary_arch = primary_arch.ok_or(Error::NoPrimaryArch)?;

    Ok(Config {
        supported_arches,
        primary_arch,
        os_release,
    })
}
