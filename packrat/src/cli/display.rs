// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::Path;

use clap::{Arg, ArgAction, ArgMatches, Command};
use thiserror::Error;

use packrat::db;
use packrat::manifest::filelist;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] db::installed::Error),
    #[error("package `{0}` is not installed")]
    NotInstalled(String),
    #[error("multiple architectures of `{0}` are installed; specify --arch")]
    AmbiguousPackage(String),
}

pub fn command() -> Command {
    Command::new("display")
        .about("Print metadata for an installed package")
        .arg(
            Arg::new("id")
                .help("Package identifier")
                .required(true)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("arch")
                .long("arch")
                .help("Architecture to display, when more than one is installed")
                .action(ArgAction::Set),
        )
}

pub fn handle(args: &ArgMatches, sysroot: &Path) -> Result<(), Error> {
    let id = args.get_one::<String>("id").expect("required");
    let arch = match args.get_one::<String>("arch") {
        Some(arch) => arch.to_string(),
        None => {
            if db::installed::has_multi_arches(sysroot, id)? {
                return Err(Error::AmbiguousPackage(id.to_string()));
            }
            db::installed::find_single_arch(sysroot, id)?.ok_or_else(|| Error::NotInstalled(id.to_string()))?
        }
    };

    let pkg = db::installed::load_package(sysroot, id, &arch)?.ok_or_else(|| Error::NotInstalled(id.to_string()))?;
    let (filelist_buf, _) = db::installed::get_files_info(sysroot, id, &arch)?.unwrap_or_default();
    let file_count = filelist::parse(&filelist_buf).len();

    println!("{}", pkg.identity());
    println!("Description: {}", pkg.description);
    println!("Files: {file_count}");
    if let Some(cmd) = &pkg.hooks.pre_install {
        println!("PreInstall: {cmd}");
    }
    if let Some(cmd) = &pkg.hooks.post_install {
        println!("PostInstall: {cmd}");
    }
    Ok(())
}
