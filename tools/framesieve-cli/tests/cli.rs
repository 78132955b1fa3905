use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const BIN: &str = env!("CARGO_BIN_EXE_framesieve");

/// Run the binary inside `dir` with no user configuration in scope.
fn framesieve(dir: &Path, args: &[&str]) -> Output {
    Command::new(BIN)
        .args(args)
        .current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join("xdg"))
        .env_remove("RUST_LOG")
        .output()
        .expect("run framesieve")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn missing_output_dir_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("clip.mp4"), b"").unwrap();

    let output = framesieve(dir.path(), &["clip.mp4"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Usage"), "{}", stderr(&output));
    assert_eq!(entries(dir.path()), vec!["clip.mp4"]);
}

#[test]
fn unknown_flag_is_rejected_before_any_work() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("clip.mp4"), b"").unwrap();

    let output = framesieve(dir.path(), &["clip.mp4", "out", "--bogus"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("--bogus"));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn invalid_frame_rates_are_usage_errors() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("clip.mp4"), b"").unwrap();

    for rate in ["0", "abc", "NaN"] {
        let output = framesieve(dir.path(), &["clip.mp4", "out", "-s", rate]);
        assert_eq!(output.status.code(), Some(1), "rate {rate}");
        assert!(!dir.path().join("out").exists());
    }
}

#[test]
fn unreadable_config_file_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.json"), b"{ not json").unwrap();

    let output = framesieve(
        dir.path(),
        &["clip.mp4", "out", "--config", "config.json"],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Configuration error"));
}

#[test]
fn broken_default_config_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config_dir = dir.path().join("xdg").join("framesieve");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.json"), b"{ not json").unwrap();

    // The default classifier paths do not exist here, so the run stops at
    // tool lookup rather than at configuration.
    let output = framesieve(dir.path(), &["clip.mp4", "out"]);

    assert_eq!(output.status.code(), Some(2), "{}", stderr(&output));
    assert!(stderr(&output).contains("Ignoring config file"));
    assert!(stderr(&output).contains("detect-blurry"));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn help_goes_to_stdout_and_succeeds() {
    let dir = tempfile::tempdir().unwrap();

    let output = framesieve(dir.path(), &["--help"]);

    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("--blurry-threshold"));
    assert!(stdout(&output).contains("--contains-faces-path"));
}

#[cfg(unix)]
mod pipeline {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Stands in for ffmpeg: writes four frames next to the output pattern,
    /// which is always the last argument.
    const FAKE_FFMPEG: &str = r#"for last; do :; done
out=$(dirname "$last")
for i in 1 2 3 4; do
  printf 'jpeg' > "$out/00000$i.jpg"
  echo "frame=$i"
  echo "progress=continue"
done
echo "progress=end""#;

    struct Workspace {
        dir: tempfile::TempDir,
    }

    impl Workspace {
        fn new(blur_body: &str, faces_body: &str) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path();
            std::fs::write(root.join("clip.mp4"), b"").unwrap();
            let ffmpeg = script(root, "fake-ffmpeg", FAKE_FFMPEG);
            script(root, "detect-blurry", blur_body);
            script(root, "contains-faces", faces_body);
            std::fs::write(
                root.join("config.json"),
                format!(
                    r#"{{ "extraction": {{ "ffmpeg_path": "{}" }} }}"#,
                    ffmpeg.display()
                ),
            )
            .unwrap();
            Self { dir }
        }

        /// Blur fails frame 2 and faces fail frame 4.
        fn standard() -> Self {
            Self::new(
                r#"case "$1" in *000002.jpg) exit 1;; esac; exit 0"#,
                r#"case "$1" in *000004.jpg) exit 1;; esac; exit 0"#,
            )
        }

        fn run(&self, extra: &[&str]) -> Output {
            self.run_with_faces("./contains-faces", extra)
        }

        fn run_with_faces(&self, faces: &str, extra: &[&str]) -> Output {
            let mut args = vec![
                "clip.mp4",
                "frames",
                "--config",
                "config.json",
                "-d",
                "./detect-blurry",
                "-p",
                faces,
            ];
            args.extend_from_slice(extra);
            framesieve(self.dir.path(), &args)
        }

        fn frames(&self) -> Vec<String> {
            entries(&self.dir.path().join("frames"))
        }
    }

    #[test]
    fn keeps_only_sharp_frames_with_faces() {
        let ws = Workspace::standard();

        let output = ws.run(&[]);

        assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));
        assert_eq!(ws.frames(), vec!["000001.jpg", "000003.jpg"]);
        assert!(stdout(&output).starts_with("Kept 2 of 4 frames"));
    }

    #[test]
    fn json_report_lists_every_frame() {
        let ws = Workspace::standard();

        let output = ws.run(&["--json", "-j", "3"]);

        assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));
        let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(report["totals"]["total"], 4);
        assert_eq!(report["totals"]["blurry"], 1);
        assert_eq!(report["totals"]["no_faces"], 1);
        assert_eq!(report["frames"][1]["outcome"], "deleted");
        assert_eq!(report["frames"][1]["reason"], "blurry");
    }

    #[test]
    fn crashing_classifier_keeps_frames_and_exits_3() {
        let ws = Workspace::new("echo 'model missing' >&2; exit 2", "exit 0");

        let output = ws.run(&[]);

        assert_eq!(output.status.code(), Some(3));
        assert_eq!(ws.frames().len(), 4);
        assert!(stdout(&output).contains("4 tool errors"));
    }

    #[test]
    fn missing_classifier_fails_before_extraction() {
        let ws = Workspace::standard();

        let output = ws.run_with_faces("./no-such-tool", &[]);

        assert_eq!(output.status.code(), Some(2));
        assert!(stderr(&output).contains("no-such-tool"), "{}", stderr(&output));
        assert!(!ws.dir.path().join("frames").exists());
    }

    #[test]
    fn missing_video_is_fatal() {
        let ws = Workspace::standard();
        std::fs::remove_file(ws.dir.path().join("clip.mp4")).unwrap();

        let output = ws.run(&[]);

        assert_eq!(output.status.code(), Some(2));
        assert!(stderr(&output).contains("clip.mp4"));
        assert!(!ws.dir.path().join("frames").exists());
    }
}
