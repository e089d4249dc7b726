//! Generated Nix expression for nix-env
//!
//! Produces one attribute set that imports every declared channel and
//! inherits the requested packages from it:
//!
//! ```text
//! let
//!   nixpkgs = import <nixpkgs> {};
//! in {
//!   inherit (nixpkgs) hello;
//! }
//! ```

use crate::types::DeclaredPackageSet;

/// Render the expression; channel and package order follow the declaration
pub fn render_defexpr(packages: &DeclaredPackageSet) -> String {
    let imports: Vec<String> = packages
        .keys()
        .map(|channel| format!("{channel} = import <{channel}> {{}};"))
        .collect();

    let inherits: Vec<String> = packages
        .iter()
        .map(|(channel, names)| format!("inherit ({channel}) {};", names.join(" ")))
        .collect();

    format!(
        "let\n  {}\nin {{\n  {}\n}}\n",
        imports.join("\n  "),
        inherits.join("\n  ")
    )
}
