//! ffmpeg-backed extraction.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use framesieve_common::cancel::CancelSignal;
use framesieve_common::error::{FramesieveError, FramesieveResult};
use framesieve_common::tools::resolve_tool;
use framesieve_frame_model::job::JobConfig;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::{ExtractBackend, ExtractProgress, ExtractStage, ProgressCallback};

/// Lines of ffmpeg stderr kept in error messages.
const STDERR_TAIL_LINES: usize = 20;

/// Extraction backend that shells out to ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    program: PathBuf,
}

impl FfmpegExtractor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Build the ffmpeg argument list for `job`.
    pub fn build_args(job: &JobConfig) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-hide_banner",
            "-nostdin",
            "-y",
            "-v",
            "error",
            "-nostats",
            "-progress",
            "pipe:1",
            "-i",
        ]
        .iter()
        .map(OsString::from)
        .collect();

        args.push(job.video_path.clone().into_os_string());
        args.push("-q:v".into());
        args.push(job.quality.to_string().into());

        if let Some(rate) = job.frame_rate {
            args.push("-vf".into());
            args.push(format!("fps={rate}").into());
        }

        args.push(
            job.output_dir
                .join(job.naming.ffmpeg_pattern())
                .into_os_string(),
        );
        args
    }
}

enum Outcome {
    Finished(std::io::Result<ExitStatus>),
    TimedOut(Duration),
    Cancelled,
}

#[async_trait]
impl ExtractBackend for FfmpegExtractor {
    async fn extract(
        &self,
        job: &JobConfig,
        progress: Option<ProgressCallback>,
        cancel: CancelSignal,
    ) -> FramesieveResult<()> {
        let args = Self::build_args(job);
        tracing::debug!(program = %self.program.display(), ?args, "Running ffmpeg");

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    FramesieveError::tool_not_found("ffmpeg", self.program.clone())
                }
                _ => FramesieveError::extraction(format!("Failed to start ffmpeg: {e}")),
            })?;

        tracing::info!(pid = child.id(), "ffmpeg process started");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FramesieveError::extraction("Failed to capture ffmpeg stdout"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| FramesieveError::extraction("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently so ffmpeg never blocks on a full pipe.
        let stderr_task = tokio::spawn(async move {
            let mut output = String::new();
            match stderr.read_to_string(&mut output).await {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let mut state = ProgressState::default();
        let drive = async {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                if let Some(report) = state.update_line(&line) {
                    tracing::debug!(
                        frames = report.frames_written,
                        out_time_secs = report.out_time_secs,
                        "ffmpeg progress"
                    );
                    if let Some(cb) = &progress {
                        cb(report);
                    }
                }
            }
            child.wait().await
        };

        let outcome = tokio::select! {
            status = drive => Outcome::Finished(status),
            elapsed = deadline(job.extract_timeout) => Outcome::TimedOut(elapsed),
            _ = cancel.cancelled() => Outcome::Cancelled,
        };

        let status = match outcome {
            Outcome::Finished(status) => status.map_err(|e| {
                FramesieveError::extraction(format!("Failed to wait on ffmpeg: {e}"))
            })?,
            Outcome::TimedOut(after) => {
                tracing::warn!(secs = after.as_secs(), "ffmpeg timed out, killing process");
                child.kill().await.ok();
                stderr_task.abort();
                return Err(FramesieveError::tool_timeout("ffmpeg", after.as_secs()));
            }
            Outcome::Cancelled => {
                tracing::info!("Extraction cancelled, killing ffmpeg");
                child.kill().await.ok();
                stderr_task.abort();
                return Err(FramesieveError::Cancelled);
            }
        };

        let stderr_output = stderr_task
            .await
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(FramesieveError::extraction(format!(
                "ffmpeg failed ({status}): {}",
                stderr_tail(&stderr_output)
            )));
        }

        if let Some(cb) = &progress {
            cb(ExtractProgress {
                frames_written: state.frame,
                out_time_secs: state.out_time_secs,
                stage: ExtractStage::Complete,
            });
        }

        Ok(())
    }

    fn is_available(&self) -> bool {
        resolve_tool("ffmpeg", &self.program).is_ok()
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Sleep for `timeout`, or forever when unset. Resolves to the timeout.
async fn deadline(timeout: Option<Duration>) -> Duration {
    match timeout {
        Some(timeout) => {
            tokio::time::sleep(timeout).await;
            timeout
        }
        None => std::future::pending().await,
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.trim().lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Accumulates ffmpeg `-progress` key/value lines.
#[derive(Debug, Default)]
struct ProgressState {
    frame: u64,
    out_time_secs: f64,
}

impl ProgressState {
    /// Feed one line; returns a report at the end of each progress block.
    fn update_line(&mut self, line: &str) -> Option<ExtractProgress> {
        let (key, value) = line.trim().split_once('=')?;
        match key {
            "frame" => {
                if let Ok(frame) = value.trim().parse() {
                    self.frame = frame;
                }
            }
            // ffmpeg reports microseconds under both keys.
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.trim().parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                return Some(ExtractProgress {
                    frames_written: self.frame,
                    out_time_secs: self.out_time_secs,
                    stage: ExtractStage::Decoding,
                });
            }
            _ => {}
        }
        None
    }
}
