//! User environment installation
//!
//! Writes the declared packages out as a Nix expression and hands it to
//! `nix-env -f <expr> -ir`, with the config override passed through
//! `NIXPKGS_CONFIG`. In check mode the same command runs with `--dry-run`.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::host::{run_checked, Host};
use crate::nix::{commands, expr};
use crate::types::{DeclaredPackageSet, OperationResult};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempPath;

/// Install exactly the declared packages into the user environment
pub fn install_packages<H: Host + ?Sized>(
    host: &mut H,
    config: &Config,
    packages: &DeclaredPackageSet,
    config_override: &str,
    check_mode: bool,
) -> Result<OperationResult> {
    let bin = host.get_bin_path(&config.env_binary, &config.search_dirs)?;
    let bin = bin.to_string_lossy().into_owned();

    let config_file = GeneratedFile::write("nixdecl-config-", config_override)?;
    let defexpr_file = GeneratedFile::write("nixdecl-defexpr-", &expr::render_defexpr(packages))?;

    let mut env = BTreeMap::new();
    env.insert(
        config.config_env_var.clone(),
        config_file.path().to_string_lossy().into_owned(),
    );

    let argv = commands::env_install(&bin, defexpr_file.path(), check_mode);
    let outcome = run_checked(host, argv, &env);

    if config.keep_generated_files {
        for file in [config_file, defexpr_file] {
            let path = file.keep()?;
            tracing::info!("kept generated file {}", path.display());
        }
    }

    outcome?;

    Ok(OperationResult {
        changed: !check_mode,
        diff: None,
    })
}

/// A uniquely named file under the temp dir, removed on drop
struct GeneratedFile(TempPath);

impl GeneratedFile {
    fn write(prefix: &str, content: &str) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(".nix")
            .tempfile()
            .map_err(|e| Error::resource(format!("failed to create {}*.nix", prefix), e))?;

        file.write_all(content.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| Error::resource(format!("failed to write {}", file.path().display()), e))?;

        tracing::debug!("wrote {}", file.path().display());
        Ok(Self(file.into_temp_path()))
    }

    fn path(&self) -> &std::path::Path {
        &self.0
    }

    fn keep(self) -> Result<PathBuf> {
        self.0
            .keep()
            .map_err(|e| Error::resource("failed to keep generated file", e.error))
    }
}
