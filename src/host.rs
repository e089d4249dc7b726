//! Host facilities the reconcilers depend on
//!
//! Process execution, executable lookup and logging sit behind the `Host`
//! trait so the reconcilers never touch `std::process` directly.

use crate::error::{quote_argv, Error, Result};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Directories appended to the search path when PATH does not list them
const SBIN_DIRS: &[&str] = &["/sbin", "/usr/sbin", "/usr/local/sbin"];

/// Captured result of one external command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub rc: i32,
    pub stdout: String,
    pub stderr: String,
}

pub trait Host {
    /// Run `argv` to completion with extra environment variables set
    fn run_command(&mut self, argv: &[String], env: &BTreeMap<String, String>) -> Result<CommandOutput>;

    /// Locate an executable, trying `extra_dirs` before PATH
    fn get_bin_path(&self, name: &str, extra_dirs: &[PathBuf]) -> Result<PathBuf>;

    fn log(&self, msg: &str) {
        tracing::info!("{}", msg);
    }

    fn debug(&self, msg: &str) {
        tracing::debug!("{}", msg);
    }
}

/// Log, run, and fail on a non-zero exit status
pub fn run_checked<H: Host + ?Sized>(
    host: &mut H,
    argv: Vec<String>,
    env: &BTreeMap<String, String>,
) -> Result<CommandOutput> {
    host.log(&quote_argv(&argv));

    let output = host.run_command(&argv, env)?;
    host.debug(&output.stdout);
    host.debug(&output.stderr);

    if output.rc != 0 {
        return Err(Error::Command {
            argv,
            rc: output.rc,
            stdout: output.stdout,
            stderr: output.stderr,
        });
    }

    Ok(output)
}

/// Real host backed by `std::process`
#[derive(Debug, Default)]
pub struct SystemHost;

impl Host for SystemHost {
    fn run_command(&mut self, argv: &[String], env: &BTreeMap<String, String>) -> Result<CommandOutput> {
        let (program, args) = argv.split_first().ok_or_else(|| Error::Spawn {
            argv: Vec::new(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
        })?;

        let output = Command::new(program)
            .args(args)
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| Error::Spawn {
                argv: argv.to_vec(),
                source,
            })?;

        Ok(CommandOutput {
            // Killed by a signal: no exit code, report as failure
            rc: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn get_bin_path(&self, name: &str, extra_dirs: &[PathBuf]) -> Result<PathBuf> {
        let path_var = env::var_os("PATH").unwrap_or_default();
        let searched = search_dirs(extra_dirs, env::split_paths(&path_var));

        searched
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| is_executable(candidate))
            .ok_or_else(|| Error::BinaryNotFound {
                name: name.to_string(),
                searched: searched.clone(),
            })
    }
}

/// Search order: extra dirs, then PATH, then any sbin dir not already present
fn search_dirs(extra_dirs: &[PathBuf], path: impl Iterator<Item = PathBuf>) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();

    for dir in extra_dirs.iter().cloned().chain(path) {
        if !dir.as_os_str().is_empty() && !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }

    for sbin in SBIN_DIRS.iter().map(PathBuf::from) {
        if !dirs.contains(&sbin) {
            dirs.push(sbin);
        }
    }

    dirs
}

fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = path.metadata() else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}
