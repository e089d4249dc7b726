//! Error taxonomy for nixdecl
//!
//! Every failure ends the run. Nothing is retried and nothing is rolled back.

use serde_json::{json, Value};
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Declared input has the wrong shape or type
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// A temporary artifact could not be created or written
    #[error("{context}: {source}")]
    Resource {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// An external command exited non-zero
    #[error("command {} failed with exit code {rc}", quote_argv(.argv))]
    Command {
        argv: Vec<String>,
        rc: i32,
        stdout: String,
        stderr: String,
    },

    /// An external command could not be started at all
    #[error("failed to execute {}: {source}", quote_argv(.argv))]
    Spawn {
        argv: Vec<String>,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to find required executable \"{name}\" in paths: {}", join_paths(.searched))]
    BinaryNotFound { name: String, searched: Vec<PathBuf> },
}

/// Declared input rejected before any command runs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("argument '{path}' is of type {found} and we were unable to convert to {expected}")]
    WrongType {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("missing required arguments: {0}")]
    Missing(String),

    #[error("Unsupported parameters: {}", .0.join(", "))]
    Unsupported(Vec<String>),

    #[error("parameters are mutually exclusive: {0}|{1}")]
    Exclusive(&'static str, &'static str),

    #[error("argument '{0}' must not be empty")]
    Empty(String),
}

impl ValidationError {
    pub fn wrong_type(path: impl Into<String>, expected: &'static str, found: &'static str) -> Self {
        ValidationError::WrongType {
            path: path.into(),
            expected,
            found,
        }
    }
}

impl Error {
    pub fn resource(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Resource {
            context: context.into(),
            source,
        }
    }

    /// Failure document printed in place of the normal result
    pub fn to_failure_json(&self) -> Value {
        let mut doc = json!({
            "failed": true,
            "changed": false,
            "msg": self.to_string(),
        });

        if let Error::Command {
            argv,
            rc,
            stdout,
            stderr,
        } = self
        {
            doc["cmd"] = json!(argv);
            doc["rc"] = json!(rc);
            doc["stdout"] = json!(stdout);
            doc["stderr"] = json!(stderr);
        }

        doc
    }
}

/// Render an argv the way it is logged: `'nix-channel' '--list'`
pub fn quote_argv(argv: &[String]) -> String {
    format!("'{}'", argv.join("' '"))
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(":")
}
