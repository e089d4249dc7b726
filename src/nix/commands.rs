//! Command lines for nix-channel and nix-env
//!
//! Builders only; execution goes through `host::run_checked`.

use std::path::Path;

/// nix-channel --list
pub fn channel_list(bin: &str) -> Vec<String> {
    vec![bin.to_string(), "--list".to_string()]
}

/// nix-channel --remove <name>
pub fn channel_remove(bin: &str, name: &str) -> Vec<String> {
    vec![bin.to_string(), "--remove".to_string(), name.to_string()]
}

/// nix-channel --add <url> <name>
pub fn channel_add(bin: &str, url: &str, name: &str) -> Vec<String> {
    vec![
        bin.to_string(),
        "--add".to_string(),
        url.to_string(),
        name.to_string(),
    ]
}

/// nix-channel --update
pub fn channel_update(bin: &str) -> Vec<String> {
    vec![bin.to_string(), "--update".to_string()]
}

/// nix-env [--dry-run] -f <defexpr> -ir
///
/// `-ir` installs every attribute of the expression and removes everything
/// else from the new generation.
pub fn env_install(bin: &str, defexpr: &Path, dry_run: bool) -> Vec<String> {
    let mut argv = vec![bin.to_string()];
    if dry_run {
        argv.push("--dry-run".to_string());
    }
    argv.push("-f".to_string());
    argv.push(defexpr.to_string_lossy().into_owned());
    argv.push("-ir".to_string());
    argv
}
