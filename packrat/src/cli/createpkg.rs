// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command};
use thiserror::Error;

use packrat::manifest::metadata::{Hooks, Package};

#[derive(Debug, Error)]
pub enum Error {
    #[error("`--packagegeneration` is not a valid non-negative integer")]
    InvalidGeneration,
    #[error(transparent)]
    Action(#[from] packrat::action::Error),
}

pub fn command() -> Command {
    Command::new("createpkg")
        .about("Build a .pkrt archive from a source tree")
        .arg(Arg::new("pkgid").long("pkgid").required(true).action(ArgAction::Set))
        .arg(Arg::new("arch").long("arch").required(true).action(ArgAction::Set))
        .arg(
            Arg::new("versionstring")
                .long("versionstring")
                .required(true)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("packagegeneration")
                .long("packagegeneration")
                .required(true)
                .action(ArgAction::Set),
        )
        .arg(Arg::new("description").long("description").action(ArgAction::Set))
        .arg(
            Arg::new("source")
                .long("source")
                .help("Directory containing the staged payload")
                .required(true)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .help("Directory the .pkrt archive is written into")
                .required(true)
                .action(ArgAction::Set),
        )
        .arg(Arg::new("preinstallcmd").long("preinstallcmd").action(ArgAction::Set))
        .arg(Arg::new("postinstallcmd").long("postinstallcmd").action(ArgAction::Set))
        .arg(Arg::new("preuninstallcmd").long("preuninstallcmd").action(ArgAction::Set))
        .arg(Arg::new("postuninstallcmd").long("postuninstallcmd").action(ArgAction::Set))
        .arg(Arg::new("preupdatecmd").long("preupdatecmd").action(ArgAction::Set))
        .arg(Arg::new("postupdatecmd").long("postupdatecmd").action(ArgAction::Set))
}

pub fn handle(args: &ArgMatches) -> Result<(), Error> {
    let generation: u64 = args
        .get_one::<String>("packagegeneration")
        .expect("required")
        .parse()
        .map_err(|_| Error::InvalidGeneration)?;

    let pkg = Package {
        package_id: args.get_one::<String>("pkgid").expect("required").clone(),
        arch: args.get_one::<String>("arch").expect("required").clone(),
        version_string: args.get_one::<String>("versionstring").expect("required").clone(),
        package_generation: generation,
        description: args.get_one::<String>("description").cloned().unwrap_or_default(),
        hooks: Hooks {
            pre_install: args.get_one::<String>("preinstallcmd").cloned(),
            post_install: args.get_one::<String>("postinstallcmd").cloned(),
            pre_uninstall: args.get_one::<String>("preuninstallcmd").cloned(),
            post_uninstall: args.get_one::<String>("postuninstallcmd").cloned(),
            pre_update: args.get_one::<String>("preupdatecmd").cloned(),
            post_update: args.get_one::<String>("postupdatecmd").cloned(),
        },
    };

    let source = PathBuf::from(args.get_one::<String>("source").expect("required"));
    let output = PathBuf::from(args.get_one::<String>("output").expect("required"));

    let archive = packrat::action::create_package(&pkg, &source, &output)?;
    log::info!("wrote {archive:?}");
    Ok(())
}
