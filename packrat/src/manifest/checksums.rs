// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! `info/checksums.txt` grammar: `hexdigest path`, one per line, split on
//! the first space only (paths never contain a leading space but may
//! theoretically contain later ones).

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumEntry {
    pub digest: String,
    pub path: String,
}

pub fn parse(buf: &str) -> Vec<ChecksumEntry> {
    buf.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<ChecksumEntry> {
    let line = line.trim_end();
    let (digest, path) = line.split_once(' ')?;
    if digest.is_empty() || path.is_empty() {
        return None;
    }
    Some(ChecksumEntry {
        digest: digest.to_string(),
        path: path.to_string(),
    })
}

pub fn emit(entries: &[ChecksumEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&entry.digest);
        out.push(' ');
        out.push_str(&entry.path);
        out.push('\n');
    }
    out
}
