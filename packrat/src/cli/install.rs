// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::{Path, PathBuf};

use clap::{Arg, ArgAction, ArgMatches, Command};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] config::Error),
    #[error(transparent)]
    Action(#[from] packrat::action::Error),
}

pub fn command() -> Command {
    Command::new("install")
        .about("Install a package archive into a sysroot")
        .arg(
            Arg::new("archive")
                .help("Path to a .pkrt archive")
                .required(true)
                .action(ArgAction::Set),
        )
}

pub fn handle(args: &ArgMatches, sysroot: &Path) -> Result<(), Error> {
    let archive = PathBuf::from(args.get_one::<String>("archive").expect("required"));
    let config = config::load(sysroot)?;
    let pkg = packrat::action::install(sysroot, &config, &archive)?;
    log::info!("installed {}", pkg.identity());
    Ok(())
}
