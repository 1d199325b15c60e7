// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Resolves user/group names against a chosen sysroot's `/etc/passwd` and
//! `/etc/group`, never the host's. Lookups tolerate short lines (missing
//! shell or home directory) and report "not found" as a plain `None`
//! rather than an error — callers decide whether that's fatal.

use std::path::Path;

use nix::unistd::{Gid, Uid};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("read {0:?}")]
    Read(std::path::PathBuf, #[source] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswdEntry {
    pub name: String,
    pub uid: Uid,
    pub gid: Gid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEntry {
    pub name: String,
    pub gid: Gid,
}

fn slurp(sysroot: &Path, relative: &str) -> Result<String, Error> {
    let path = sysroot.join(relative);
    fs_err::read_to_string(&path).map_err(|e| Error::Read(path, e))
}

fn parse_passwd_line(line: &str) -> Option<(String, u32, u32)> {
    let mut fields = line.split(':');
    let name = fields.next()?.to_string();
    let _password = fields.next()?;
    let uid: u32 = fields.next()?.parse().ok()?;
    let gid: u32 = fields.next()?.parse().ok()?;
    Some((name, uid, gid))
}

fn parse_group_line(line: &str) -> Option<(String, u32)> {
    let mut fields = line.split(':');
    let name = fields.next()?.to_string();
    let _password = fields.next()?;
    let gid: u32 = fields.next()?.parse().ok()?;
    Some((name, gid))
}

/// Looks up a user by name in `<sysroot>/etc/passwd`.
pub fn lookup_user_name(sysroot: &Path, name: &str) -> Result<Option<PasswdEntry>, Error> {
    let contents = slurp(sysroot, "etc/passwd")?;
    Ok(contents
        .lines()
        .filter_map(parse_passwd_line)
        .find(|(n, _, _)| n == name)
        .map(|(name, uid, gid)| PasswdEntry {
            name,
            uid: Uid::from_raw(uid),
            gid: Gid::from_raw(gid),
        }))
}

/// Looks up a user by numeric id in `<sysroot>/etc/passwd`.
pub fn lookup_user_id(sysroot: &Path, uid: u32) -> Result<Option<PasswdEntry>, Error> {
    let contents = slurp(sysroot, "etc/passwd")?;
    Ok(contents
        .lines()
        .filter_map(parse_passwd_line)
        .find(|(_, u, _)| *u == uid)
        .map(|(name, uid, gid)| PasswdEntry {
            name,
            uid: Uid::from_raw(uid),
            gid: Gid::from_raw(gid),
        }))
}

/// Looks up a group by name in `<sysroot>/etc/group`.
pub fn lookup_group_name(sysroot: &Path, name: &str) -> Result<Option<GroupEntry>, Error> {
    let contents = slurp(sysroot, "etc/group")?;
    Ok(contents
        .lines()
        .filter_map(parse_group_line)
        .find(|(n, _)| n == name)
        .map(|(name, gid)| GroupEntry {
            name,
            gid: Gid::from_raw(gid),
        }))
}

/// Looks up a group by numeric id in `<sysroot>/etc/group`.
pub fn lookup_group_id(sysroot: &Path, gid: u32) -> Result<Option<GroupEntry>, Error> {
    let contents = slurp(sysroot, "etc/group")?;
    Ok(contents
        .lines()
        .filter_map(parse_group_line)
        .find(|(_, g)| *g == gid)
        .map(|(name, gid)| GroupEntry {
            name,
            gid: Gid::from_raw(gid),
        }))
}

/// Resolves a `user:group` pair (as written in a file-list entry) to raw
/// ids against `sysroot`. Either side missing yields `None` for that side.
pub fn resolve(sysroot: &Path, user: &str, group: &str) -> Result<(Option<Uid>, Option<Gid>), Error> {
    let uid = lookup_user_name(sysroot, user)?.map(|e| e.uid);
    let gid = lookup_group_name(sysroot, group)?.map(|e| e.gid);
    Ok((uid, gid))
}

#[cfg(test)]
mod test {
    use super::*;

    fn sysroot() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("etc")).unwrap();
        std::fs::write(
            dir.path().join("etc/passwd"),
            "root:x:0:0:root:/root:/bin/sh\nbin:x:1:1\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("etc/group"), "root:x:0:\nbin:x:1:\n").unwrap();
        dir
    }

    #[test]
    fn looks_up_user_by_name() {
        let dir = sysroot();
        let entry = lookup_user_name(dir.path(), "root").unwrap().unwrap();
        assert_eq!(entry.uid.as_raw(), 0);
        assert_eq!(entry.gid.as_raw(), 0);
    }

    #[test]
    fn tolerates_short_lines() {
        let dir = sysroot();
        let entry = lookup_user_name(dir.path(), "bin").unwrap().unwrap();
        assert_eq!(entry.uid.as_raw(), 1);
    }

    #[test]
    fn missing_user_is_none_not_error() {
        let dir = sysroot();
        assert!(lookup_user_name(dir.path(), "ghost").unwrap().is_none());
    }

    #[test]
    fn looks_up_group_by_id() {
        let dir = sysroot();
        let entry = lookup_group_id(dir.path(), 0).unwrap().unwrap();
        assert_eq!(entry.name, "root");
    }
}
