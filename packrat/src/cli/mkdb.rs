// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::Path;

use clap::Command;
use thiserror::Error;

use packrat::db;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] db::installed::Error),
}

pub fn command() -> Command {
    Command::new("mkdb").about("Initialize an empty installed-package database")
}

pub fn handle(sysroot: &Path) -> Result<(), Error> {
    db::installed::initialize_empty(sysroot)?;
    log::info!("initialized {:?}", db::installed::path(sysroot));
    Ok(())
}
