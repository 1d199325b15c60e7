// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::Path;

use clap::{Arg, ArgAction, ArgMatches, Command};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Action(#[from] packrat::action::Error),
}

pub fn command() -> Command {
    Command::new("remove")
        .alias("uninstall")
        .about("Remove an installed package")
        .arg(
            Arg::new("id")
                .help("Package identifier")
                .required(true)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("arch")
                .long("arch")
                .help("Architecture to remove, when more than one is installed")
                .action(ArgAction::Set),
        )
}

pub fn handle(args: &ArgMatches, sysroot: &Path) -> Result<(), Error> {
    let id = args.get_one::<String>("id").expect("required");
    let arch = args.get_one::<String>("arch").map(String::as_str);
    packrat::action::uninstall(sysroot, id, arch)?;
    log::info!("removed {id}");
    Ok(())
}
