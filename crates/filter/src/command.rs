//! Classifier backed by an external program.
//!
//! The program is invoked as `<program> <image> <flag> <value>` and answers
//! through its exit status:
//!
//! | exit status        | verdict     |
//! |--------------------|-------------|
//! | 0                  | `Pass`      |
//! | 1                  | `Fail`      |
//! | anything else      | `ToolError` |
//!
//! Spawn failures, signals and timeouts are also `ToolError`.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::classifier::{Check, Classifier, Verdict};

/// Exit status a classifier uses for an explicit "no".
pub const NEGATIVE_EXIT_CODE: i32 = 1;

/// Bytes of stderr carried into a tool error.
const STDERR_DETAIL_LIMIT: usize = 512;

/// Runs an external program once per classification.
#[derive(Debug, Clone)]
pub struct CommandClassifier {
    name: String,
    program: PathBuf,
    flag: String,
    timeout: Duration,
}

impl CommandClassifier {
    pub fn new(
        name: impl Into<String>,
        program: impl Into<PathBuf>,
        flag: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            flag: flag.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Classifier for CommandClassifier {
    async fn classify(&self, image: &Path, check: &Check) -> Verdict {
        let mut cmd = Command::new(&self.program);
        cmd.arg(image)
            .arg(&self.flag)
            .arg(check.value_arg())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let started = std::time::Instant::now();
        // On timeout the output future is dropped, which kills the child.
        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Verdict::ToolError(format!(
                    "{} not found at {}",
                    self.name,
                    self.program.display()
                ));
            }
            Ok(Err(e)) => {
                return Verdict::ToolError(format!("failed to run {}: {e}", self.name));
            }
            Err(_) => {
                return Verdict::ToolError(format!(
                    "{} timed out after {}s",
                    self.name,
                    self.timeout.as_secs()
                ));
            }
        };

        tracing::trace!(
            classifier = %self.name,
            image = %image.display(),
            status = %output.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Classifier finished"
        );

        match output.status.code() {
            Some(0) => Verdict::Pass,
            Some(NEGATIVE_EXIT_CODE) => Verdict::Fail,
            _ => Verdict::ToolError(format!(
                "{} {}: {}",
                self.name,
                output.status,
                stderr_detail(&output.stderr)
            )),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn stderr_detail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.is_empty() {
        return "<no stderr>".to_string();
    }
    let mut end = text.len().min(STDERR_DETAIL_LIMIT);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}
