//! Per-host text transcripts.
//!
//! One file per host, named after the host, with the output of every
//! command in the order it ran:
//!
//! ```text
//! Device: R1
//! Command: show version
//! Cisco IOS Software, ...
//! ----------------------------------------
//! ```

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use log::{debug, trace, warn};
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};
use crate::fleet::FleetReport;
use crate::pipeline::HostResult;

const SEPARATOR_WIDTH: usize = 40;

/// Render the transcript text for one host.
pub fn render(result: &HostResult) -> String {
    let mut out = String::new();
    let separator = "-".repeat(SEPARATOR_WIDTH);

    let _ = writeln!(out, "Device: {}", result.host.name);
    for outcome in &result.outcomes {
        let _ = writeln!(out, "Command: {}", outcome.command);
        if let Some(kind) = outcome.error {
            let detail = outcome.detail.as_deref().unwrap_or_default();
            let _ = writeln!(out, "Error ({}): {}", kind, detail);
        }
        let _ = writeln!(out, "{}", outcome.output);
        let _ = writeln!(out, "{}", separator);
    }

    if let Some(error) = &result.overall_error {
        let _ = writeln!(out, "Stage: {}", result.stage);
        let _ = writeln!(out, "Error: {}", error);
    }
    out
}

/// Writes host transcripts into one directory.
#[derive(Debug, Clone)]
pub struct TranscriptWriter {
    dir: PathBuf,
}

impl TranscriptWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Transcript path for a host name.
    ///
    /// Characters that cannot appear in a file name are replaced with `_`.
    pub fn path_for(&self, host: &str) -> PathBuf {
        self.dir.join(format!("{}.txt", file_stem(host)))
    }

    /// Write one host's transcript, replacing any previous one.
    ///
    /// The file is written next to its final path and renamed into place,
    /// so readers never see a partial transcript.
    pub async fn write(&self, result: &HostResult) -> Result<PathBuf> {
        let path = self.path_for(&result.host.name);
        self.write_to(result, path).await
    }

    async fn write_to(&self, result: &HostResult, path: PathBuf) -> Result<PathBuf> {
        let tmp = path.with_extension("txt.tmp");
        let io_err = |source: std::io::Error| Error::Transcript {
            path: path.clone(),
            source,
        };

        tokio::fs::create_dir_all(&self.dir).await.map_err(io_err)?;

        let replaced = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(render(result).as_bytes()).await?;
            file.flush().await?;
            drop(file);
            tokio::fs::rename(&tmp, &path).await
        }
        .await;

        if let Err(e) = replaced {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                trace!("{}: {}", tmp.display(), cleanup);
            }
            return Err(io_err(e));
        }

        debug!("{}: transcript written to {}", result.host.name, path.display());
        Ok(path)
    }

    /// Write a transcript for every host in `report`.
    ///
    /// Hosts whose names map to the same file get a numbered suffix
    /// (`core_1.txt`, `core_1-2.txt`). A failed write is logged and
    /// skipped; the paths written are returned.
    pub async fn write_all(&self, report: &FleetReport) -> Vec<PathBuf> {
        let mut taken = HashSet::with_capacity(report.results.len());
        let mut written = Vec::with_capacity(report.results.len());

        for result in &report.results {
            let name = &result.host.name;
            let mut path = self.path_for(name);
            let mut n = 2;
            while taken.contains(&path) {
                path = self.dir.join(format!("{}-{}.txt", file_stem(name), n));
                n += 1;
            }
            if n > 2 {
                warn!(
                    "{}: transcript name already used, writing {}",
                    name,
                    path.display()
                );
            }
            taken.insert(path.clone());

            match self.write_to(result, path).await {
                Ok(path) => written.push(path),
                Err(e) => warn!("{}: {}", name, e),
            }
        }
        written
    }
}

fn file_stem(host: &str) -> String {
    let name: String = host
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0' => '_',
            c => c,
        })
        .collect();
    match name.trim_matches('.') {
        "" => "_".to_string(),
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::inventory::{Credentials, Host};
    use crate::pipeline::{CommandOutcome, Stage};
    use std::sync::Arc;
    use std::time::Duration;

    fn result(name: &str) -> HostResult {
        HostResult {
            host: Arc::new(Host::new(name, "192.0.2.1", "cisco", Credentials::new("u", "p"))),
            outcomes: vec![
                CommandOutcome {
                    command: "show version".into(),
                    output: "Cisco IOS Software, Version 15.2".into(),
                    error: None,
                    detail: None,
                    elapsed: Duration::from_millis(40),
                },
                CommandOutcome {
                    command: "show bogus".into(),
                    output: String::new(),
                    error: Some(ErrorKind::CommandFailed),
                    detail: Some("% Invalid input detected".into()),
                    elapsed: Duration::from_millis(10),
                },
            ],
            stage: Stage::Completed,
            overall_error: None,
            elapsed: Duration::from_millis(900),
        }
    }

    fn scratch_dir(test: &str) -> PathBuf {
        std::env::temp_dir().join(format!("netfleet-{}-{}", test, std::process::id()))
    }

    #[test]
    fn test_render_layout() {
        let text = render(&result("R1"));
        let separator = "-".repeat(40);
        assert_eq!(
            text,
            format!(
                "Device: R1\n\
                 Command: show version\nCisco IOS Software, Version 15.2\n{sep}\n\
                 Command: show bogus\nError (command failed): % Invalid input detected\n\n{sep}\n",
                sep = separator
            )
        );
    }

    #[test]
    fn test_render_failed_host() {
        let result = HostResult::not_run(
            Arc::new(Host::new("R2", "192.0.2.2", "cisco", Credentials::new("u", "p"))),
            Stage::AuthFailed,
            "auth failed: Authentication failed for user 'u'",
        );
        assert_eq!(
            render(&result),
            "Device: R2\nStage: auth_failed\nError: auth failed: Authentication failed for user 'u'\n"
        );
    }

    #[test]
    fn test_path_sanitized() {
        let writer = TranscriptWriter::new("/tmp/out");
        assert_eq!(writer.path_for("R1"), PathBuf::from("/tmp/out/R1.txt"));
        assert_eq!(writer.path_for("core/1:a"), PathBuf::from("/tmp/out/core_1_a.txt"));
        assert_eq!(writer.path_for(".."), PathBuf::from("/tmp/out/_.txt"));
    }

    #[tokio::test]
    async fn test_write_replaces_previous() {
        let dir = scratch_dir("write");
        let writer = TranscriptWriter::new(&dir);

        let path = writer.write(&result("R1")).await.unwrap();
        assert_eq!(path, dir.join("R1.txt"));

        let mut second = result("R1");
        second.outcomes.truncate(1);
        writer.write(&second).await.unwrap();

        let text = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(text, render(&second));
        assert!(!dir.join("R1.txt.tmp").exists());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_write_all() {
        let dir = scratch_dir("write-all");
        let writer = TranscriptWriter::new(&dir);
        let report = FleetReport {
            results: vec![result("R1"), result("R2")],
            elapsed: Duration::from_secs(1),
        };

        let written = writer.write_all(&report).await;
        assert_eq!(written, [dir.join("R1.txt"), dir.join("R2.txt")]);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_write_all_colliding_names() {
        let dir = scratch_dir("collide");
        let writer = TranscriptWriter::new(&dir);
        let report = FleetReport {
            results: vec![result("core/1"), result("core:1"), result("core_1-2")],
            elapsed: Duration::from_secs(1),
        };

        let written = writer.write_all(&report).await;
        assert_eq!(
            written,
            [
                dir.join("core_1.txt"),
                dir.join("core_1-2.txt"),
                dir.join("core_1-2-2.txt"),
            ]
        );
        let text = tokio::fs::read_to_string(dir.join("core_1-2.txt")).await.unwrap();
        assert!(text.starts_with("Device: core:1\n"));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_rename_removes_tmp() {
        let dir = scratch_dir("rename");
        tokio::fs::create_dir_all(dir.join("R1.txt")).await.unwrap();
        let writer = TranscriptWriter::new(&dir);

        let err = writer.write(&result("R1")).await.unwrap_err();
        assert!(matches!(err, Error::Transcript { .. }));
        assert!(!dir.join("R1.txt.tmp").exists());
        assert!(dir.join("R1.txt").is_dir());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
