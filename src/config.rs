use crate::cli::Cli;
use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";

#[derive(Debug, Clone)]
pub struct Config {
    pub server: String,
    pub snapshot: Option<PathBuf>,
    pub debug: bool,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let dirs = ProjectDirs::from("", "", "noteline").context("locating data directory")?;
        Config::resolve(cli, dirs.data_dir().to_path_buf())
    }

    fn resolve(cli: &Cli, data_dir: PathBuf) -> Result<Self> {
        let server = cli.server.trim().trim_end_matches('/').to_string();
        if !(server.starts_with("http://") || server.starts_with("https://")) {
            bail!("server must be an http(s) URL: {}", cli.server);
        }
        Ok(Config {
            server,
            snapshot: cli.snapshot.clone(),
            debug: cli.debug,
            data_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn defaults_to_local_server_and_tui() {
        let cli = parse(&["noteline", "--server", DEFAULT_SERVER]);
        assert!(cli.command.is_none());
        let config = Config::resolve(&cli, PathBuf::from("/tmp/x")).unwrap();
        assert_eq!(config.server, "http://127.0.0.1:5000");
        assert!(!config.debug);
    }

    #[test]
    fn trailing_slash_is_dropped() {
        let cli = parse(&["noteline", "--server", "https://notes.example/", "list"]);
        let config = Config::resolve(&cli, PathBuf::new()).unwrap();
        assert_eq!(config.server, "https://notes.example");
    }

    #[test]
    fn rejects_non_http_server() {
        let cli = parse(&["noteline", "--server", "ftp://nope"]);
        assert!(Config::resolve(&cli, PathBuf::new()).is_err());
    }

    #[test]
    fn edit_flags_conflict() {
        let res = Cli::try_parse_from([
            "noteline",
            "edit",
            "3",
            "--deadline",
            "2026-01-01T10:00",
            "--clear-deadline",
        ]);
        assert!(res.is_err());
    }
}
