use anyhow::Context;
use playdeck::app::{self, AppConfig};
use playdeck::backend::BackendConfig;
use playdeck::backend::control::send_control;
use playdeck::config;
use playdeck::downloader::DownloaderConfig;
use playdeck::protocol::TransportCommand;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "playdeck.log";
const LOG_ENV: &str = "PLAYDECK_LOG";

#[derive(Debug, Default)]
struct CliArgs {
    library: Option<PathBuf>,
    downloader: Option<String>,
    control: Option<String>,
    remote: Option<(String, TransportCommand)>,
}

fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1).collect())?;

    if let Some((addr, command)) = args.remote {
        return send_control(&addr, command);
    }

    let config_dir = config::ensure_config_dir()?;
    init_logging(&config_dir)?;

    let library_dir = args.library.unwrap_or_else(config::default_library_dir);
    let downloader = args
        .downloader
        .map_or_else(DownloaderConfig::default, DownloaderConfig::script);
    info!(library = %library_dir.display(), program = %downloader.program, "playdeck starting");

    app::run(AppConfig {
        backend: BackendConfig {
            library_dir,
            settings_path: config::settings_path()?,
            downloader,
        },
        control_addr: args.control,
    })
}

fn init_logging(config_dir: &Path) -> anyhow::Result<()> {
    let log_path = config_dir.join(LOG_FILE);
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .with_env_filter(filter)
        .init();
    Ok(())
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--library" => {
                out.library = Some(PathBuf::from(required_value(&args, &mut index, "--library")?));
            }
            "--downloader" => {
                out.downloader = Some(required_value(&args, &mut index, "--downloader")?);
            }
            "--control" => {
                out.control = Some(required_value(&args, &mut index, "--control")?);
            }
            "--remote" => {
                let addr = required_value(&args, &mut index, "--remote")?;
                let raw = required_value(&args, &mut index, "--remote")?;
                let Some(command) = TransportCommand::parse(&raw) else {
                    anyhow::bail!("unknown remote command {raw}; expected play-pause, next or prev");
                };
                out.remote = Some((addr, command));
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument {other}"),
        }
        index += 1;
    }
    Ok(out)
}

fn required_value(args: &[String], index: &mut usize, flag: &str) -> anyhow::Result<String> {
    *index += 1;
    let Some(value) = args.get(*index) else {
        anyhow::bail!("{flag} requires a value");
    };
    if value.trim().is_empty() {
        anyhow::bail!("{flag} cannot be empty");
    }
    Ok(value.trim().to_string())
}

fn print_help() {
    println!("playdeck");
    println!("  --library DIR              Music directory (default ./Playlist)");
    println!("  --downloader PROGRAM       Script invoked as PROGRAM <link> <dir>");
    println!("  --control host:port        Accept remote transport commands");
    println!("  --remote host:port CMD     Send play-pause, next or prev to a running player");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn parses_library_and_control() {
        let parsed = parse_args(args(&["--library", "/music", "--control", "127.0.0.1:7878"]))
            .expect("parse");
        assert_eq!(parsed.library, Some(PathBuf::from("/music")));
        assert_eq!(parsed.control.as_deref(), Some("127.0.0.1:7878"));
        assert!(parsed.remote.is_none());
    }

    #[test]
    fn parses_remote_command() {
        let parsed = parse_args(args(&["--remote", "127.0.0.1:7878", "next"])).expect("parse");
        assert_eq!(
            parsed.remote,
            Some((String::from("127.0.0.1:7878"), TransportCommand::NextSong))
        );
    }

    #[test]
    fn rejects_missing_values_and_unknown_flags() {
        assert!(parse_args(args(&["--library"])).is_err());
        assert!(parse_args(args(&["--remote", "127.0.0.1:7878"])).is_err());
        assert!(parse_args(args(&["--remote", "127.0.0.1:7878", "eject"])).is_err());
        assert!(parse_args(args(&["--loud"])).is_err());
    }
}
