// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! `info/filelist.txt` grammar: `d|f user:group:mode path`, one per line.
//! Directories precede their own contents in a well-formed list; lines
//! that don't match the grammar are skipped rather than treated as a
//! parse failure, since emitters never produce them.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEntry {
    Directory { path: String, owner: String, group: String, mode: u32 },
    File { path: String, owner: String, group: String, mode: u32 },
}

impl FileEntry {
    pub fn path(&self) -> &str {
        match self {
            FileEntry::Directory { path, .. } | FileEntry::File { path, .. } => path,
        }
    }

    pub fn owner(&self) -> &str {
        match self {
            FileEntry::Directory { owner, .. } | FileEntry::File { owner, .. } => owner,
        }
    }

    pub fn group(&self) -> &str {
        match self {
            FileEntry::Directory { group, .. } | FileEntry::File { group, .. } => group,
        }
    }

    pub fn mode(&self) -> u32 {
        match self {
            FileEntry::Directory { mode, .. } | FileEntry::File { mode, .. } => *mode,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, FileEntry::Directory { .. })
    }
}

impl fmt::Display for FileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = if self.is_directory() { 'd' } else { 'f' };
        write!(f, "{tag} {}:{}:{:o} {}", self.owner(), self.group(), self.mode(), self.path())
    }
}

/// Parses a file-list buffer. Malformed lines are dropped silently.
pub fn parse(buf: &str) -> Vec<FileEntry> {
    buf.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<FileEntry> {
    let line = line.trim_end();
    let (tag, rest) = line.split_once(' ')?;
    let (owner_group_mode, path) = rest.split_once(' ')?;
    let mut parts = owner_group_mode.splitn(3, ':');
    let owner = parts.next()?.to_string();
    let group = parts.next()?.to_string();
    let mode = u32::from_str_radix(parts.next()?, 8).ok()?;

    match tag {
        "d" => Some(FileEntry::Directory {
            path: path.to_string(),
            owner,
            group,
            mode,
        }),
        "f" => Some(FileEntry::File {
            path: path.to_string(),
            owner,
            group,
            mode,
        }),
        _ => None,
    }
}

/// Serializes a file list, one entry per line, in the given order.
pub fn emit(entries: &[FileEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&entry.to_string());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trip() {
        let entries = vec![
            FileEntry::Directory {
                path: "usr/bin".into(),
                owner: "root".into(),
                group: "root".into(),
                mode: 0o755,
            },
            FileEntry::File {
                path: "usr/bin/hello".into(),
                owner: "root".into(),
                group: "root".into(),
                mode: 0o755,
            },
        ];
        let text = emit(&entries);
        assert_eq!(parse(&text), entries);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let text = "not a valid line\nf root:root:755 usr/bin/ok\n";
        let entries = parse(text);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path(), "usr/bin/ok");
    }

    #[test]
    fn mode_parses_as_octal() {
        let entries = parse("f root:root:644 etc/conf\n");
        assert_eq!(entries[0].mode(), 0o644);
    }
}
