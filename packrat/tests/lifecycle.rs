// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! End-to-end scenarios against throwaway sysroots (S1-S6, §8).

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use packrat::action;
use packrat::db;
use packrat::manifest::metadata::{Hooks, Package};

fn sysroot(dir: &Path, extra_conf: &str) -> PathBuf {
    let sysroot = dir.join("sysroot");
    std::fs::create_dir_all(sysroot.join("etc")).unwrap();
    std::fs::write(sysroot.join("etc/passwd"), "root:x:0:0:root:/root:/bin/sh\n").unwrap();
    std::fs::write(sysroot.join("etc/group"), "root:x:0:\n").unwrap();
    std::fs::write(sysroot.join("etc/packrat.conf"), format!("Arch=@noarch\n{extra_conf}")).unwrap();
    db::installed::initialize_empty(&sysroot).unwrap();
    sysroot
}

fn build(dir: &Path, name: &str, pkg: &Package, files: &[(&str, &[u8])]) -> PathBuf {
    let source = dir.join(format!("source-{name}"));
    for (path, contents) in files {
        let full = source.join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(&full, contents).unwrap();
    }
    let out = dir.join("out");
    std::fs::create_dir_all(&out).unwrap();
    packrat::builder::create_package(pkg, &source, &out).unwrap()
}

fn hello_package(arch: &str) -> Package {
    Package {
        package_id: "hello".into(),
        arch: arch.into(),
        version_string: "1.0".into(),
        package_generation: 1,
        description: "greeting".into(),
        hooks: Hooks::default(),
    }
}

/// S1 - install then uninstall.
#[test]
fn install_then_uninstall_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let sysroot = sysroot(dir.path(), "");
    let config = config::load(&sysroot).unwrap();

    let archive = build(
        dir.path(),
        "hello",
        &hello_package("noarch"),
        &[("usr/bin/hello", b"#!/bin/sh\necho hi\n")],
    );

    action::install(&sysroot, &config, &archive).unwrap();
    let installed_meta = std::fs::metadata(sysroot.join("usr/bin/hello")).unwrap();
    assert_eq!(installed_meta.permissions().mode() & 0o777, 0o755);

    action::uninstall(&sysroot, "hello", None).unwrap();
    assert!(!sysroot.join("usr/bin/hello").exists());
    assert!(db::installed::load_package(&sysroot, "hello", "noarch").unwrap().is_none());
}

/// S2 - multi-arch coexistence.
#[test]
fn multi_arch_coexistence_requires_explicit_arch_on_remove() {
    let dir = tempfile::tempdir().unwrap();
    let sysroot = sysroot(dir.path(), "Arch=x86_64\nArch=i686\n");
    let config = config::load(&sysroot).unwrap();

    let mut libc_x86 = hello_package("x86_64");
    libc_x86.package_id = "libc".into();
    libc_x86.version_string = "2.0".into();
    let mut libc_i686 = hello_package("i686");
    libc_i686.package_id = "libc".into();
    libc_i686.version_string = "2.0".into();

    let x86_archive = build(dir.path(), "libc-x86", &libc_x86, &[("lib/libc.so", b"x86")]);
    let i686_archive = build(dir.path(), "libc-i686", &libc_i686, &[("lib/libc.so", b"i686")]);

    action::install(&sysroot, &config, &x86_archive).unwrap();
    action::install(&sysroot, &config, &i686_archive).unwrap();

    let err = action::uninstall(&sysroot, "libc", None).unwrap_err();
    assert!(matches!(err, action::Error::AmbiguousPackage(_)));

    action::uninstall(&sysroot, "libc", Some("x86_64")).unwrap();
    assert!(db::installed::load_package(&sysroot, "libc", "x86_64").unwrap().is_none());
    assert!(db::installed::load_package(&sysroot, "libc", "i686").unwrap().is_some());
}

/// S3 - update deletes obsolete files and keeps new ones.
#[test]
fn update_deletes_obsolete_files() {
    let dir = tempfile::tempdir().unwrap();
    let sysroot = sysroot(dir.path(), "");
    let config = config::load(&sysroot).unwrap();

    let old_archive = build(dir.path(), "demo-old", &hello_package("noarch"), &[("usr/bin/old", b"old")]);
    action::install(&sysroot, &config, &old_archive).unwrap();

    let mut new_pkg = hello_package("noarch");
    new_pkg.version_string = "2.0".into();
    let new_archive = build(dir.path(), "demo-new", &new_pkg, &[("usr/bin/new", b"new")]);
    action::update(&sysroot, &config, &new_archive).unwrap();

    assert!(!sysroot.join("usr/bin/old").exists());
    assert_eq!(std::fs::read(sysroot.join("usr/bin/new")).unwrap(), b"new");
}

/// S4 - checksum failure aborts before any sysroot mutation.
#[test]
fn checksum_mismatch_leaves_sysroot_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let sysroot = sysroot(dir.path(), "");
    let config = config::load(&sysroot).unwrap();

    let archive = build(dir.path(), "hello", &hello_package("noarch"), &[("usr/bin/hello", b"original")]);

    // Corrupt the payload inside the already-built archive: extract, mutate, recompress.
    let scratch = tempfile::tempdir().unwrap();
    packrat::archive::extract(&archive, scratch.path()).unwrap();
    std::fs::write(scratch.path().join("files/usr/bin/hello"), b"corrupted").unwrap();
    let corrupted = dir.path().join("corrupted.pkrt");
    packrat::archive::compress(scratch.path(), &corrupted).unwrap();

    let err = action::install(&sysroot, &config, &corrupted).unwrap_err();
    assert!(matches!(err, action::Error::Builder(packrat::builder::Error::ChecksumMismatch { .. })));
    assert!(!sysroot.join("usr/bin/hello").exists());
}

/// S5 - a failing hook is a warning, not a failure.
#[test]
fn hook_exit_nonzero_is_non_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let sysroot = sysroot(dir.path(), "");
    let config = config::load(&sysroot).unwrap();

    let mut pkg = hello_package("noarch");
    pkg.hooks.post_install = Some("exit 7".into());
    let archive = build(dir.path(), "hello", &pkg, &[("usr/bin/hello", b"hi")]);

    action::install(&sysroot, &config, &archive).unwrap();
    assert!(db::installed::load_package(&sysroot, "hello", "noarch").unwrap().is_some());
}

/// S6 - reverse install reproduces the stored file list and checksums.
#[test]
fn reverse_install_matches_stored_record() {
    let dir = tempfile::tempdir().unwrap();
    let sysroot = sysroot(dir.path(), "");
    let config = config::load(&sysroot).unwrap();

    let archive = build(dir.path(), "hello", &hello_package("noarch"), &[("usr/bin/hello", b"hi")]);
    action::install(&sysroot, &config, &archive).unwrap();

    let (stored_filelist, stored_checksums) = db::installed::get_files_info(&sysroot, "hello", "noarch").unwrap().unwrap();

    let out = dir.path().join("reverse-out");
    std::fs::create_dir_all(&out).unwrap();
    let reversed = action::reverse_install(&sysroot, "hello", "noarch", &out).unwrap();

    let extracted = tempfile::tempdir().unwrap();
    packrat::archive::extract(&reversed, extracted.path()).unwrap();
    assert_eq!(std::fs::read_to_string(extracted.path().join("info/filelist.txt")).unwrap(), stored_filelist);
    assert_eq!(std::fs::read_to_string(extracted.path().join("info/checksums.txt")).unwrap(), stored_checksums);
}

/// P7 - teardown totality: no cache directory survives a completed action.
#[test]
fn cache_directory_does_not_survive_a_completed_action() {
    let dir = tempfile::tempdir().unwrap();
    let sysroot = sysroot(dir.path(), "");
    let config = config::load(&sysroot).unwrap();

    let archive = build(dir.path(), "hello", &hello_package("noarch"), &[("usr/bin/hello", b"hi")]);
    action::install(&sysroot, &config, &archive).unwrap();

    let cache_root = sysroot.join("var/packrat/cache");
    let leftover = std::fs::read_dir(&cache_root).unwrap().count();
    assert_eq!(leftover, 0);
}

/// An empty file list installs and uninstalls as a no-op on files, while
/// still writing and removing the DB row (§8, lines 244-248).
#[test]
fn empty_file_list_is_a_no_op_on_files_but_not_on_the_db() {
    let dir = tempfile::tempdir().unwrap();
    let sysroot = sysroot(dir.path(), "");
    let config = config::load(&sysroot).unwrap();

    let source = dir.path().join("source-empty");
    std::fs::create_dir_all(&source).unwrap();
    let out = dir.path().join("out");
    std::fs::create_dir_all(&out).unwrap();
    let archive = packrat::builder::create_package(&hello_package("noarch"), &source, &out).unwrap();

    action::install(&sysroot, &config, &archive).unwrap();
    assert!(db::installed::load_package(&sysroot, "hello", "noarch").unwrap().is_some());

    action::uninstall(&sysroot, "hello", None).unwrap();
    assert!(db::installed::load_package(&sysroot, "hello", "noarch").unwrap().is_none());
}

/// A file list made only of directory entries creates those directories on
/// install and leaves them in place on uninstall, while the DB row is still
/// written and removed (§8, lines 244-248).
#[test]
fn directory_only_file_list_creates_dirs_and_survives_uninstall() {
    let dir = tempfile::tempdir().unwrap();
    let sysroot = sysroot(dir.path(), "");
    let config = config::load(&sysroot).unwrap();

    let source = dir.path().join("source-dirs");
    std::fs::create_dir_all(source.join("usr/share/hello")).unwrap();
    let out = dir.path().join("out");
    std::fs::create_dir_all(&out).unwrap();
    let archive = packrat::builder::create_package(&hello_package("noarch"), &source, &out).unwrap();

    action::install(&sysroot, &config, &archive).unwrap();
    assert!(sysroot.join("usr/share/hello").is_dir());
    assert!(db::installed::load_package(&sysroot, "hello", "noarch").unwrap().is_some());

    action::uninstall(&sysroot, "hello", None).unwrap();
    assert!(sysroot.join("usr/share/hello").is_dir());
    assert!(db::installed::load_package(&sysroot, "hello", "noarch").unwrap().is_none());
}

/// A destination path already occupied by a non-empty directory fails
/// install when the file list declares it a regular file (§8, lines
/// 244-248).
#[test]
fn install_fails_when_destination_is_a_non_empty_directory() {
    let dir = tempfile::tempdir().unwrap();
    let sysroot = sysroot(dir.path(), "");
    let config = config::load(&sysroot).unwrap();

    std::fs::create_dir_all(sysroot.join("usr/bin/hello")).unwrap();
    std::fs::write(sysroot.join("usr/bin/hello/blocker"), b"in the way").unwrap();

    let archive = build(dir.path(), "hello", &hello_package("noarch"), &[("usr/bin/hello", b"hi")]);

    let err = action::install(&sysroot, &config, &archive).unwrap_err();
    assert!(matches!(err, action::Error::FileOps(_)));
    assert!(sysroot.join("usr/bin/hello/blocker").exists());
}
