use crate::model::JobId;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::Sender;
use std::thread;
use thiserror::Error;
use tracing::{info, warn};

const LINK_PLACEHOLDER: &str = "{link}";
const DIR_PLACEHOLDER: &str = "{dir}";

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("empty download link")]
    EmptyLink,

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("downloader exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },

    #[error("downloader reported an error: {0}")]
    Stderr(String),

    #[error("downloader printed no file path")]
    NoOutput,
}

/// External program invocation. `{link}` and `{dir}` in `args` are replaced
/// with the submitted link and the library directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloaderConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl DownloaderConfig {
    /// yt-dlp fetching the best audio stream and printing the final path.
    pub fn yt_dlp() -> Self {
        let args = [
            "-f",
            "bestaudio/best",
            "--no-playlist",
            "--no-warnings",
            "--no-progress",
            "--print",
            "after_move:filepath",
            "-P",
            DIR_PLACEHOLDER,
            "-o",
            "%(title)s.%(ext)s",
            LINK_PLACEHOLDER,
        ];
        Self {
            program: String::from("yt-dlp"),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        }
    }

    /// A script invoked as `program <link> <dir>` that prints the file path.
    pub fn script(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec![LINK_PLACEHOLDER.to_string(), DIR_PLACEHOLDER.to_string()],
        }
    }

    fn command(&self, link: &str, dir: &Path) -> Command {
        let dir = dir.to_string_lossy();
        let mut command = Command::new(&self.program);
        for arg in &self.args {
            command.arg(
                arg.replace(LINK_PLACEHOLDER, link)
                    .replace(DIR_PLACEHOLDER, dir.as_ref()),
            );
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self::yt_dlp()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Completed { job: JobId, path: PathBuf },
    Failed { job: JobId, reason: String },
}

impl DownloadOutcome {
    pub fn job(&self) -> JobId {
        match self {
            Self::Completed { job, .. } | Self::Failed { job, .. } => *job,
        }
    }
}

/// Runs download jobs on their own threads. Jobs cannot be cancelled; each
/// reports exactly one outcome.
pub struct Downloader {
    config: DownloaderConfig,
    output_dir: PathBuf,
    next_job: u64,
    outcome_tx: Sender<DownloadOutcome>,
}

impl Downloader {
    pub fn new(
        config: DownloaderConfig,
        output_dir: impl Into<PathBuf>,
        outcome_tx: Sender<DownloadOutcome>,
    ) -> Self {
        Self {
            config,
            output_dir: output_dir.into(),
            next_job: 1,
            outcome_tx,
        }
    }

    pub fn submit(&mut self, link: &str) -> Result<JobId, DownloadError> {
        let link = link.trim();
        if link.is_empty() {
            return Err(DownloadError::EmptyLink);
        }

        let job = JobId(self.next_job);
        self.next_job += 1;

        let config = self.config.clone();
        let output_dir = self.output_dir.clone();
        let outcome_tx = self.outcome_tx.clone();
        let link = link.to_string();
        info!(%job, %link, "download submitted");

        thread::spawn(move || {
            let outcome = match run_job(&config, &link, &output_dir) {
                Ok(path) => {
                    info!(%job, path = %path.display(), "download completed");
                    DownloadOutcome::Completed { job, path }
                }
                Err(err) => {
                    warn!(%job, error = %err, "download failed");
                    DownloadOutcome::Failed {
                        job,
                        reason: err.to_string(),
                    }
                }
            };
            let _ = outcome_tx.send(outcome);
        });

        Ok(job)
    }
}

/// Runs the downloader to completion and returns the reported file path.
pub fn run_job(config: &DownloaderConfig, link: &str, dir: &Path) -> Result<PathBuf, DownloadError> {
    let output = config
        .command(link, dir)
        .output()
        .map_err(|source| DownloadError::Spawn {
            program: config.program.clone(),
            source,
        })?;

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if !output.status.success() {
        return Err(DownloadError::Exit {
            status: output.status.to_string(),
            stderr,
        });
    }
    if !stderr.is_empty() {
        return Err(DownloadError::Stderr(stderr));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let reported = stdout
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .ok_or(DownloadError::NoOutput)?;

    let path = PathBuf::from(reported);
    Ok(if path.is_absolute() {
        path
    } else {
        dir.join(path)
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;
    use tempfile::tempdir;

    fn shell(script: &str) -> DownloaderConfig {
        DownloaderConfig {
            program: String::from("sh"),
            args: vec![
                String::from("-c"),
                script.to_string(),
                String::from("sh"),
                String::from(LINK_PLACEHOLDER),
                String::from(DIR_PLACEHOLDER),
            ],
        }
    }

    #[test]
    fn last_stdout_line_is_the_file_path() {
        let dir = tempdir().expect("tempdir");
        let config = shell(r#"echo "fetching $1"; echo "$2/clip.webm""#);
        let path = run_job(&config, "https://example.com/v", dir.path()).expect("run");
        assert_eq!(path, dir.path().join("clip.webm"));
    }

    #[test]
    fn relative_paths_resolve_against_output_dir() {
        let dir = tempdir().expect("tempdir");
        let path = run_job(&shell("echo clip.m4a"), "link", dir.path()).expect("run");
        assert_eq!(path, dir.path().join("clip.m4a"));
    }

    #[test]
    fn non_zero_exit_fails() {
        let dir = tempdir().expect("tempdir");
        let err = run_job(&shell("echo boom >&2; exit 3"), "link", dir.path()).expect_err("fail");
        match err {
            DownloadError::Exit { stderr, .. } => assert_eq!(stderr, "boom"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn stderr_output_fails_even_on_success() {
        let dir = tempdir().expect("tempdir");
        let err = run_job(&shell("echo a.mp3; echo oops >&2"), "link", dir.path())
            .expect_err("fail");
        assert!(matches!(err, DownloadError::Stderr(message) if message == "oops"));
    }

    #[test]
    fn silent_success_fails() {
        let dir = tempdir().expect("tempdir");
        let err = run_job(&shell("true"), "link", dir.path()).expect_err("fail");
        assert!(matches!(err, DownloadError::NoOutput));
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let dir = tempdir().expect("tempdir");
        let config = DownloaderConfig::script("/definitely/not/a/downloader");
        let err = run_job(&config, "link", dir.path()).expect_err("fail");
        assert!(matches!(err, DownloadError::Spawn { .. }));
    }

    #[test]
    fn submit_reports_each_job_once_with_its_id() {
        let dir = tempdir().expect("tempdir");
        let (tx, rx) = mpsc::channel();
        let mut downloader = Downloader::new(shell(r#"echo "$1.mp3""#), dir.path(), tx);

        let first = downloader.submit("one").expect("submit");
        let second = downloader.submit("two").expect("submit");
        assert_ne!(first, second);
        assert!(matches!(downloader.submit("  "), Err(DownloadError::EmptyLink)));

        let mut outcomes: Vec<DownloadOutcome> = (0..2)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).expect("outcome"))
            .collect();
        outcomes.sort_by_key(|outcome| outcome.job().0);
        assert_eq!(
            outcomes,
            vec![
                DownloadOutcome::Completed {
                    job: first,
                    path: dir.path().join("one.mp3"),
                },
                DownloadOutcome::Completed {
                    job: second,
                    path: dir.path().join("two.mp3"),
                },
            ]
        );
    }

    #[test]
    fn placeholders_are_substituted() {
        let config = DownloaderConfig::script("fetch");
        let command = config.command("https://x", Path::new("/lib"));
        let args: Vec<_> = command.get_args().map(|arg| arg.to_string_lossy().to_string()).collect();
        assert_eq!(args, vec!["https://x", "/lib"]);
    }
}
