//! Config file loading and flag precedence.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::Parser;
use omop_cli::cli::{Cli, Command, LinkArgs, MapArgs};
use omop_cli::config::{ConfigError, LinkConfig, LinkSettings, MapSettings};
use tempfile::TempDir;

fn link_args(args: &[&str]) -> LinkArgs {
    let argv = ["omop-link", "link"].into_iter().chain(args.iter().copied());
    match Cli::try_parse_from(argv).unwrap().command {
        Command::Link(args) => args,
        _ => unreachable!(),
    }
}

fn map_args(args: &[&str]) -> MapArgs {
    let argv = ["omop-link", "map"].into_iter().chain(args.iter().copied());
    match Cli::try_parse_from(argv).unwrap().command {
        Command::Map(args) => args,
        _ => unreachable!(),
    }
}

fn write_config(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("omop-link.toml");
    fs::write(&path, contents).unwrap();
    path
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn config_paths_are_relative_to_the_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        dir.path(),
        "index_date = \"2015-06-01\"\nvocabulary = \"vocab/CONCEPT.csv\"\nwrite_checkpoints = true\n",
    );
    let config = LinkConfig::load(&path).unwrap();
    assert_eq!(config.index_date, Some(date(2015, 6, 1)));
    assert_eq!(config.vocabulary, Some(dir.path().join("vocab/CONCEPT.csv")));
    assert_eq!(config.write_checkpoints, Some(true));
    assert_eq!(config.output_dir, None);
}

#[test]
fn flags_override_config_values() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        dir.path(),
        "index_date = \"2015-06-01\"\nvocabulary = \"a.csv\"\noutput_dir = \"out\"\n",
    );
    let config = path.to_str().unwrap();
    let settings = LinkSettings::resolve(&link_args(&[
        "in",
        "--config",
        config,
        "--vocabulary",
        "b.csv",
        "--index-date",
        "2016-02-02",
    ]))
    .unwrap();

    assert_eq!(settings.vocabulary, PathBuf::from("b.csv"));
    assert_eq!(settings.output_dir, dir.path().join("out"));
    assert_eq!(settings.options.index_date, date(2016, 2, 2));
    assert!(!settings.options.write_checkpoints);
}

#[test]
fn defaults_apply_without_config() {
    let settings = LinkSettings::resolve(&link_args(&["in", "--vocabulary", "v.csv"])).unwrap();
    assert_eq!(settings.output_dir, PathBuf::from("in").join("final_omop"));
    assert_eq!(settings.options.index_date, date(2016, 1, 1));

    let map = MapSettings::resolve(&map_args(&["exports"])).unwrap();
    assert_eq!(map.output_dir, PathBuf::from("exports").join("processed_source"));
    assert_eq!(map.index_date, date(2016, 1, 1));
}

#[test]
fn vocabulary_is_required() {
    let err = LinkSettings::resolve(&link_args(&["in"])).unwrap_err();
    assert!(matches!(err, ConfigError::MissingVocabulary));
}

#[test]
fn unknown_keys_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), "index_dat = \"2015-06-01\"\n");
    assert!(matches!(
        LinkConfig::load(&path),
        Err(ConfigError::Toml { .. })
    ));
}

#[test]
fn missing_config_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        LinkConfig::load(&dir.path().join("absent.toml")),
        Err(ConfigError::Io { .. })
    ));
}
