// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Codecs for the three text files carried inside a package: the file
//! list, the checksum list, and the metadata key/value block.

pub mod checksums;
pub mod filelist;
pub mod metadata;

pub use checksums::ChecksumEntry;
pub use filelist::FileEntry;
pub use metadata::Package;
