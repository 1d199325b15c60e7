// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Runs a single shell command rooted at a sysroot.
//!
//! Isolation is a plain `chroot`, not namespace unsharing: lifecycle hooks
//! only need a working directory inside the target filesystem, never a
//! network- or pid-isolated sandbox. When the caller lacks `CAP_SYS_CHROOT`
//! the command still runs, just without the chroot, against `root` as a
//! path prefix instead.

use std::ffi::CString;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{chdir, chroot, execvp, fork, ForkResult};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("fork hook process")]
    Fork(#[source] Errno),
    #[error("wait for hook process")]
    Wait(#[source] Errno),
    #[error("hook process terminated by signal")]
    Signaled,
    #[error("command string contains a NUL byte")]
    InvalidCommand,
}

pub struct Container {
    root: PathBuf,
    work_dir: PathBuf,
}

impl Container {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            work_dir: PathBuf::from("/"),
        }
    }

    pub fn work_dir(self, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            ..self
        }
    }

    /// Runs `command` via `sh -c`. Returns the child's exit code; a
    /// non-zero code is the caller's concern, never an `Err` here.
    pub fn run(&self, command: &str) -> Result<i32, Error> {
        let sh = CString::new("sh").map_err(|_| Error::InvalidCommand)?;
        let dash_c = CString::new("-c").map_err(|_| Error::InvalidCommand)?;
        let command = CString::new(command).map_err(|_| Error::InvalidCommand)?;

        // SAFETY: the child performs only async-signal-safe work before exec:
        // chroot/chdir syscalls and execvp, then exits on failure.
        match unsafe { fork() }.map_err(Error::Fork)? {
            ForkResult::Parent { child } => match waitpid(child, None).map_err(Error::Wait)? {
                WaitStatus::Exited(_, code) => Ok(code),
                _ => Err(Error::Signaled),
            },
            ForkResult::Child => {
                enter_and_exec(&self.root, &self.work_dir, &sh, &dash_c, &command);
            }
        }
    }
}

fn enter_and_exec(root: &Path, work_dir: &Path, sh: &CString, dash_c: &CString, command: &CString) -> ! {
    let isolated = chroot(root).is_ok();

    let dir = if isolated {
        work_dir.to_path_buf()
    } else {
        root.join(work_dir.strip_prefix("/").unwrap_or(work_dir))
    };

    if chdir(&dir).is_err() {
        let _ = chdir("/");
    }

    match execvp(sh, &[sh.clone(), dash_c.clone(), command.clone()]) {
        Ok(_) => unreachable!("execvp only returns on failure"),
        Err(_) => std::process::exit(127),
    }
}
