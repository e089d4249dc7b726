//! Core data types for nixdecl
//!
//! Declared state comes in as insertion-ordered maps so that external
//! commands run in the order the caller wrote the entries.

use indexmap::IndexMap;
use serde::Serialize;

/// Channel name -> source URL
pub type DeclaredChannelSet = IndexMap<String, String>;

/// Channel name -> package names, order and duplicates preserved
pub type DeclaredPackageSet = IndexMap<String, Vec<String>>;

/// Default override when the caller gives none: an empty attribute set
pub const DEFAULT_CONFIG_OVERRIDE: &str = "{}";

/// A channel as reported by `nix-channel --list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObservedChannel {
    pub name: String,
    pub url: String,
}

/// Difference between observed and declared channels
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<String>,
}

impl ChannelDiff {
    pub fn calculate(observed: &[ObservedChannel], declared: &DeclaredChannelSet) -> Self {
        let mut diff = ChannelDiff::default();

        for channel in observed {
            match declared.get(&channel.name) {
                None => diff.removed.push(channel.name.clone()),
                Some(url) if *url != channel.url => diff.changed.push(channel.name.clone()),
                Some(_) => {}
            }
        }

        diff.added = declared
            .keys()
            .filter(|name| !observed.iter().any(|c| &c.name == *name))
            .cloned()
            .collect();

        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Outcome of one reconciler run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationResult {
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<ChannelDiff>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observed(name: &str, url: &str) -> ObservedChannel {
        ObservedChannel {
            name: name.into(),
            url: url.into(),
        }
    }

    #[test]
    fn test_channel_diff() {
        let current = vec![
            observed("nixpkgs", "https://nixos.org/channels/nixos-23.11"),
            observed("home-manager", "https://example.org/hm.tar.gz"),
            observed("stale", "https://example.org/stale.tar.gz"),
        ];
        let mut declared = DeclaredChannelSet::new();
        declared.insert("nixpkgs".into(), "https://nixos.org/channels/nixpkgs-unstable".into());
        declared.insert("home-manager".into(), "https://example.org/hm.tar.gz".into());
        declared.insert("extra".into(), "https://example.org/extra.tar.gz".into());

        let diff = ChannelDiff::calculate(&current, &declared);
        assert_eq!(diff.added, vec!["extra"]);
        assert_eq!(diff.removed, vec!["stale"]);
        assert_eq!(diff.changed, vec!["nixpkgs"]);
        assert!(!diff.is_empty());
    }

    #[test]
    fn test_channel_diff_converged() {
        let current = vec![observed("nixpkgs", "https://nixos.org/channels/nixpkgs-unstable")];
        let mut declared = DeclaredChannelSet::new();
        declared.insert("nixpkgs".into(), "https://nixos.org/channels/nixpkgs-unstable".into());

        assert!(ChannelDiff::calculate(&current, &declared).is_empty());
    }

    #[test]
    fn test_result_serialization() {
        let result = OperationResult {
            changed: true,
            diff: None,
        };
        assert_eq!(serde_json::to_string(&result).unwrap(), r#"{"changed":true}"#);
    }
}
