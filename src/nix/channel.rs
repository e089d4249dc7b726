//! Channel reconciliation
//!
//! Converges the channel list to exactly the declared set by removing every
//! current channel, adding the declared ones, and running one update. There
//! is no per-entry patching, so a non-check run always reports a change.
//!
//! The sequence is not atomic: if a later step fails, the channels removed so
//! far stay removed. Failures log which ones are missing.

use crate::config::Config;
use crate::error::Result;
use crate::host::{run_checked, Host};
use crate::nix::commands;
use crate::types::{ChannelDiff, DeclaredChannelSet, ObservedChannel, OperationResult};
use std::collections::BTreeMap;

/// Bring the channel list in line with `declared`
pub fn reconcile_channels<H: Host + ?Sized>(
    host: &mut H,
    config: &Config,
    declared: &DeclaredChannelSet,
    check_mode: bool,
) -> Result<OperationResult> {
    let bin = host.get_bin_path(&config.channel_binary, &config.search_dirs)?;
    let bin = bin.to_string_lossy().into_owned();

    let observed = list_channels(host, &bin)?;
    let diff = ChannelDiff::calculate(&observed, declared);
    tracing::debug!(
        added = diff.added.len(),
        removed = diff.removed.len(),
        changed = diff.changed.len(),
        "channel diff computed"
    );

    if diff.is_empty() {
        tracing::info!("channels already match; re-applying anyway");
    }

    if check_mode {
        tracing::info!("check mode: skipping remove, add and update");
        return Ok(OperationResult {
            changed: false,
            diff: Some(diff),
        });
    }

    let mut progress = Progress::default();
    if let Err(err) = apply(host, &bin, &observed, declared, &mut progress) {
        let missing = progress.missing();
        if !missing.is_empty() {
            tracing::warn!(
                "channel reconciliation aborted; removed and not restored: {}",
                missing.join(", ")
            );
        }
        return Err(err);
    }

    Ok(OperationResult {
        changed: true,
        diff: Some(diff),
    })
}

/// Query the current channels
pub fn list_channels<H: Host + ?Sized>(host: &mut H, bin: &str) -> Result<Vec<ObservedChannel>> {
    let output = run_checked(host, commands::channel_list(bin), &BTreeMap::new())?;
    Ok(parse_channel_list(&output.stdout))
}

/// Parse `nix-channel --list` output: one `<name> <url>` per line
///
/// The name ends at the first whitespace; the rest of the line is the URL.
pub fn parse_channel_list(output: &str) -> Vec<ObservedChannel> {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }

            let (name, url) = match line.split_once(char::is_whitespace) {
                Some((name, rest)) => (name, rest.trim_start()),
                None => (line, ""),
            };

            Some(ObservedChannel {
                name: name.to_string(),
                url: url.to_string(),
            })
        })
        .collect()
}

/// Channels removed and re-added so far in this run
#[derive(Debug, Default)]
struct Progress {
    removed: Vec<String>,
    added: Vec<String>,
}

impl Progress {
    fn missing(&self) -> Vec<&str> {
        self.removed
            .iter()
            .filter(|name| !self.added.contains(*name))
            .map(String::as_str)
            .collect()
    }
}

fn apply<H: Host + ?Sized>(
    host: &mut H,
    bin: &str,
    observed: &[ObservedChannel],
    declared: &DeclaredChannelSet,
    progress: &mut Progress,
) -> Result<()> {
    let no_env = BTreeMap::new();

    for channel in observed {
        run_checked(host, commands::channel_remove(bin, &channel.name), &no_env)?;
        progress.removed.push(channel.name.clone());
    }

    for (name, url) in declared {
        run_checked(host, commands::channel_add(bin, url, name), &no_env)?;
        progress.added.push(name.clone());
    }

    run_checked(host, commands::channel_update(bin), &no_env)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::host::fake::FakeHost;

    const UNSTABLE: &str = "https://nixos.org/channels/nixpkgs-unstable";

    fn declared(entries: &[(&str, &str)]) -> DeclaredChannelSet {
        entries
            .iter()
            .map(|(name, url)| (name.to_string(), url.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_channel_list() {
        let output = "nixpkgs https://nixos.org/channels/nixpkgs-unstable\n\
                      \n\
                      home-manager   https://example.org/hm.tar.gz\n\
                      orphan\n";

        let channels = parse_channel_list(output);
        assert_eq!(channels.len(), 3);
        assert_eq!(channels[0].name, "nixpkgs");
        assert_eq!(channels[0].url, UNSTABLE);
        assert_eq!(channels[1].name, "home-manager");
        assert_eq!(channels[1].url, "https://example.org/hm.tar.gz");
        assert_eq!(channels[2].name, "orphan");
        assert_eq!(channels[2].url, "");
    }

    #[test]
    fn test_parse_keeps_rest_of_line_as_url() {
        let channels = parse_channel_list("odd https://a b\n");
        assert_eq!(channels[0].url, "https://a b");
    }

    #[test]
    fn test_empty_target_single_channel() {
        let mut host = FakeHost::new();
        let result = reconcile_channels(
            &mut host,
            &Config::default(),
            &declared(&[("nixpkgs", UNSTABLE)]),
            false,
        )
        .unwrap();

        assert!(result.changed);
        assert_eq!(
            host.calls(),
            vec![
                vec!["--list"],
                vec!["--add", UNSTABLE, "nixpkgs"],
                vec!["--update"],
            ]
        );
        assert_eq!(
            host.invocations[0].argv[0],
            "/nix/var/nix/profiles/default/bin/nix-channel"
        );
    }

    #[test]
    fn test_removes_everything_then_adds_in_declared_order() {
        let mut host = FakeHost::new().reply(
            0,
            "nixpkgs https://nixos.org/channels/nixpkgs-unstable\nold https://example.org/old.tar.gz\n",
            "",
        );
        let wanted = declared(&[
            ("zeta", "https://example.org/zeta.tar.gz"),
            ("nixpkgs", UNSTABLE),
            ("alpha", "https://example.org/alpha.tar.gz"),
        ]);

        let result = reconcile_channels(&mut host, &Config::default(), &wanted, false).unwrap();

        assert!(result.changed);
        assert_eq!(
            host.calls(),
            vec![
                vec!["--list"],
                vec!["--remove", "nixpkgs"],
                vec!["--remove", "old"],
                vec!["--add", "https://example.org/zeta.tar.gz", "zeta"],
                vec!["--add", UNSTABLE, "nixpkgs"],
                vec!["--add", "https://example.org/alpha.tar.gz", "alpha"],
                vec!["--update"],
            ]
        );

        let diff = result.diff.unwrap();
        assert_eq!(diff.added, vec!["zeta", "alpha"]);
        assert_eq!(diff.removed, vec!["old"]);
        assert!(diff.changed.is_empty());
    }

    #[test]
    fn test_already_converged_still_reapplies() {
        let mut host = FakeHost::new().reply(0, "nixpkgs https://nixos.org/channels/nixpkgs-unstable\n", "");
        let result = reconcile_channels(
            &mut host,
            &Config::default(),
            &declared(&[("nixpkgs", UNSTABLE)]),
            false,
        )
        .unwrap();

        assert!(result.changed);
        assert!(result.diff.unwrap().is_empty());
        assert_eq!(host.invocations.len(), 4);
    }

    #[test]
    fn test_check_mode_only_lists() {
        let mut host = FakeHost::new().reply(0, "old https://example.org/old.tar.gz\n", "");
        let result = reconcile_channels(
            &mut host,
            &Config::default(),
            &declared(&[("nixpkgs", UNSTABLE)]),
            true,
        )
        .unwrap();

        assert!(!result.changed);
        assert_eq!(host.calls(), vec![vec!["--list"]]);

        let diff = result.diff.unwrap();
        assert_eq!(diff.added, vec!["nixpkgs"]);
        assert_eq!(diff.removed, vec!["old"]);
    }

    #[test]
    fn test_list_failure_is_fatal() {
        let mut host = FakeHost::new().reply(1, "", "cannot read channels");
        let err = reconcile_channels(
            &mut host,
            &Config::default(),
            &declared(&[("nixpkgs", UNSTABLE)]),
            false,
        )
        .unwrap_err();

        assert!(matches!(err, Error::Command { rc: 1, .. }));
        assert_eq!(host.invocations.len(), 1);
    }

    #[test]
    fn test_add_failure_aborts_without_update() {
        let mut host = FakeHost::new()
            .reply(0, "nixpkgs https://nixos.org/channels/nixpkgs-unstable\n", "")
            .reply(0, "", "")
            .reply(1, "", "invalid url");

        let err = reconcile_channels(
            &mut host,
            &Config::default(),
            &declared(&[("nixpkgs", "not a url"), ("extra", "https://example.org/extra")]),
            false,
        )
        .unwrap_err();

        match err {
            Error::Command { argv, stderr, .. } => {
                assert_eq!(argv[1..], ["--add", "not a url", "nixpkgs"]);
                assert_eq!(stderr, "invalid url");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(
            host.calls(),
            vec![
                vec!["--list"],
                vec!["--remove", "nixpkgs"],
                vec!["--add", "not a url", "nixpkgs"],
            ]
        );
    }

    #[test]
    fn test_progress_missing() {
        let progress = Progress {
            removed: vec!["a".into(), "b".into()],
            added: vec!["b".into()],
        };
        assert_eq!(progress.missing(), vec!["a"]);
    }

    #[test]
    fn test_binary_not_found_runs_nothing() {
        let mut host = FakeHost::new();
        host.missing = Some("nix-channel".to_string());

        let err = reconcile_channels(&mut host, &Config::default(), &declared(&[]), false).unwrap_err();
        assert!(matches!(err, Error::BinaryNotFound { .. }));
        assert!(host.invocations.is_empty());
    }
}
