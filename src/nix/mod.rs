//! Nix interaction layer
//!
//! This module drives the Nix command-line tools:
//! - Channel reconciliation (`nix-channel`)
//! - User environment installation (`nix-env`)
//! - The generated expression handed to `nix-env`

pub mod channel;
pub mod commands;
pub mod env;
pub mod expr;

pub use channel::reconcile_channels;
pub use env::install_packages;
