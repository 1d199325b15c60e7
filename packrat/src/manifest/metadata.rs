// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! `info/metadata.txt` grammar: `Key=Value` lines. Unknown keys are
//! ignored on read; the emitter writes recognized keys in a stable order
//! and omits empty optional fields.

use thiserror::Error;

/// A fallback description used when a package ships none, matching the
/// historical tool's behavior rather than leaving the field blank.
pub const DEFAULT_DESCRIPTION: &str = "No description provided for this package.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hooks {
    pub pre_install: Option<String>,
    pub post_install: Option<String>,
    pub pre_uninstall: Option<String>,
    pub post_uninstall: Option<String>,
    pub pre_update: Option<String>,
    pub post_update: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub package_id: String,
    pub arch: String,
    pub version_string: String,
    pub package_generation: u64,
    pub description: String,
    pub hooks: Hooks,
}

impl Package {
    pub fn identity(&self) -> String {
        format!(
            "{}_{}-{}.{}",
            self.package_id, self.version_string, self.package_generation, self.arch
        )
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("metadata missing required field `{0}`")]
    MissingField(&'static str),
    #[error("metadata field `PackageGeneration` is not a valid non-negative integer")]
    InvalidGeneration,
}

pub fn parse(buf: &str) -> Result<Package, Error> {
    let mut package_id = None;
    let mut arch = None;
    let mut version_string = None;
    let mut package_generation = 0u64;
    let mut description = None;
    let mut hooks = Hooks::default();

    for line in buf.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();

        match key.trim() {
            "PackageID" => package_id = Some(value.to_string()),
            "Arch" => arch = Some(value.to_string()),
            "VersionString" => version_string = Some(value.to_string()),
            "PackageGeneration" => {
                package_generation = value.parse().map_err(|_| Error::InvalidGeneration)?;
            }
            "Description" => description = Some(value.to_string()),
            "PreInstall" => hooks.pre_install = non_empty(value),
            "PostInstall" => hooks.post_install = non_empty(value),
            "PreUninstall" => hooks.pre_uninstall = non_empty(value),
            "PostUninstall" => hooks.post_uninstall = non_empty(value),
            "PreUpdate" => hooks.pre_update = non_empty(value),
            "PostUpdate" => hooks.post_update = non_empty(value),
            _ => continue,
        }
    }

    Ok(Package {
        package_id: package_id.ok_or(Error::MissingField("PackageID"))?,
        arch: arch.ok_or(Error::MissingField("Arch"))?,
        version_string: version_string.ok_or(Error::MissingField("VersionString"))?,
        package_generation,
        description: description.unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        hooks,
    })
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

pub fn emit(pkg: &Package) -> String {
    let mut out = String::new();
    out.push_str(&format!("PackageID={}\n", pkg.package_id));
    out.push_str(&format!("Arch={}\n", pkg.arch));
    out.push_str(&format!("VersionString={}\n", pkg.version_string));
    out.push_str(&format!("PackageGeneration={}\n", pkg.package_generation));
    if !pkg.description.is_empty() {
        out.push_str(&format!("Description={}\n", pkg.description));
    }
    let hook = |name: &str, value: &Option<String>, out: &mut String| {
        if let Some(v) = value {
            out.push_str(&format!("{name}={v}\n"));
        }
    };
    hook("PreInstall", &pkg.hooks.pre_install, &mut out);
    hook("PostInstall", &pkg.hooks.post_install, &mut out);
    hook("PreUninstall", &pkg.hooks.pre_uninstall, &mut out);
    hook("PostUninstall", &pkg.hooks.post_uninstall, &mut out);
    hook("PreUpdate", &pkg.hooks.pre_update, &mut out);
    hook("PostUpdate", &pkg.hooks.post_update, &mut out);
    out
}
