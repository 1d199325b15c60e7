// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Streaming SHA-1 digests over staged files.

use std::io::{self, Read};
use std::path::Path;

use sha1::{Digest, Sha1};
use thiserror::Error;

const CHUNK_SIZE: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum Error {
    #[error("open {0:?} for hashing")]
    Open(std::path::PathBuf, #[source] io::Error),
    #[error("read {0:?} while hashing")]
    Read(std::path::PathBuf, #[source] io::Error),
}

/// Lowercase hex SHA-1 digest of `path`'s contents.
pub fn digest_file(path: &Path) -> Result<String, Error> {
    let mut file = fs_err::File::open(path).map_err(|e| Error::Open(path.to_path_buf(), e))?;

    let mut hasher = Sha1::new();
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let read = file
            .read(&mut buf)
            .map_err(|e| Error::Read(path.to_path_buf(), e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn digest_is_full_width_lowercase_hex() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello");
        std::fs::write(&path, b"#!/bin/sh\necho hi\n").unwrap();

        let digest = digest_file(&path).unwrap();
        assert_eq!(digest.len(), 40);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn identical_bytes_identical_digest() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::write(&a, b"same contents").unwrap();
        std::fs::write(&b, b"same contents").unwrap();
        assert_eq!(digest_file(&a).unwrap(), digest_file(&b).unwrap());
    }

    #[test]
    fn different_bytes_different_digest() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::write(&a, b"one").unwrap();
        std::fs::write(&b, b"two").unwrap();
        assert_ne!(digest_file(&a).unwrap(), digest_file(&b).unwrap());
    }
}
