// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::PathBuf;

use clap::{Arg, ArgAction, Command};
use thiserror::Error;

mod createpkg;
mod display;
mod install;
mod mkdb;
mod remove;
mod update;

fn command() -> Command {
    Command::new("packrat")
        .about("Sysroot package lifecycle tool")
        .arg(
            Arg::new("root")
                .short('D')
                .long("directory")
                .global(true)
                .help("Sysroot to operate against")
                .action(ArgAction::Set)
                .default_value("/"),
        )
        .arg(
            Arg::new("yes")
                .short('y')
                .long("yes-all")
                .global(true)
                .help("Assume yes for all questions")
                .action(ArgAction::SetTrue),
        )
        .arg_required_else_help(true)
        .subcommand(createpkg::command())
        .subcommand(install::command())
        .subcommand(remove::command())
        .subcommand(update::command())
        .subcommand(display::command())
        .subcommand(mkdb::command())
}

/// Process all CLI arguments
pub fn process() -> Result<(), Error> {
    let matches = command().get_matches();
    let sysroot = PathBuf::from(matches.get_one::<String>("root").expect("has default"));

    match matches.subcommand() {
        Some(("createpkg", args)) => createpkg::handle(args).map_err(Error::CreatePkg),
        Some(("install", args)) => install::handle(args, &sysroot).map_err(Error::Install),
        Some(("remove", args)) => remove::handle(args, &sysroot).map_err(Error::Remove),
        Some(("update", args)) => update::handle(args, &sysroot).map_err(Error::Update),
        Some(("display", args)) => display::handle(args, &sysroot).map_err(Error::Display),
        Some(("mkdb", _)) => mkdb::handle(&sysroot).map_err(Error::Mkdb),
        _ => unreachable!(),
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("createpkg: {0}")]
    CreatePkg(#[from] createpkg::Error),
    #[error("install: {0}")]
    Install(#[from] install::Error),
    #[error("remove: {0}")]
    Remove(#[from] remove::Error),
    #[error("update: {0}")]
    Update(#[from] update::Error),
    #[error("display: {0}")]
    Display(#[from] display::Error),
    #[error("mkdb: {0}")]
    Mkdb(#[from] mkdb::Error),
}
