//! CLI parse tests.

use super::{targets_path, Cli, CliCommand};
use clap::Parser;
use std::path::Path;
use targetd_core::config::TargetdConfig;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(args).unwrap()
}

#[test]
fn cli_parse_run_defaults() {
    let cli = parse(&["targetd", "run"]);
    assert!(!cli.logs_to_stderr());
    match cli.command {
        CliCommand::Run { targets, foreground } => {
            assert!(targets.is_none());
            assert!(!foreground);
        }
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_parse_run_with_targets_and_foreground() {
    let cli = parse(&["targetd", "run", "--targets", "/srv/targets.json", "--foreground"]);
    assert!(cli.logs_to_stderr());
    match cli.command {
        CliCommand::Run { targets, foreground } => {
            assert_eq!(targets.as_deref(), Some(Path::new("/srv/targets.json")));
            assert!(foreground);
        }
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_parse_once_and_config() {
    let cli = parse(&["targetd", "once", "--targets", "t.json"]);
    assert!(cli.logs_to_stderr());
    assert!(matches!(cli.command, CliCommand::Once { targets: Some(_) }));
    assert!(matches!(parse(&["targetd", "config"]).command, CliCommand::Config));
}

#[test]
fn cli_rejects_unknown_subcommand() {
    assert!(Cli::try_parse_from(["targetd", "pause", "1"]).is_err());
}

#[test]
fn targets_flag_overrides_config() {
    let cfg = TargetdConfig {
        targets_path: Some("/etc/targetd/targets.json".into()),
        ..TargetdConfig::default()
    };
    assert_eq!(
        targets_path(&cfg, Some(Path::new("/tmp/x.json"))).unwrap(),
        Path::new("/tmp/x.json")
    );
    assert_eq!(
        targets_path(&cfg, None).unwrap(),
        Path::new("/etc/targetd/targets.json")
    );
    assert!(targets_path(&TargetdConfig::default(), None).is_err());
}
