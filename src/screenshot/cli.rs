//! Privileged CLI capture utility
//!
//! Last stage of the capture chain. The utility runs under its own signing
//! trust and takes a different compositor code path than the imaging API,
//! so it can succeed on windows whose buffers the API refuses to serialize.
//! Output goes to a private temp file that is decoded and then deleted.
//! Diagnostics go to an anonymous temp file so a chatty utility can never
//! block on a full pipe.

use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::process::{Command, Stdio};
use std::time::Duration;

use image::RgbaImage;
use wait_timeout::ChildExt;

use super::chain::CliFailure;

/// Bounded wait on the external process
pub const CLI_TIMEOUT: Duration = Duration::from_secs(5);

const WINDOW_PLACEHOLDER: &str = "{window}";
const OUTPUT_PLACEHOLDER: &str = "{output}";

/// A capture command line constrained to one window id
#[derive(Debug, Clone)]
pub struct CliCapture {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CliCapture {
    /// `args` may contain `{window}` and `{output}` placeholders
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: CLI_TIMEOUT,
        }
    }

    /// The capture utility for the host platform
    pub fn platform_default() -> Self {
        #[cfg(target_os = "macos")]
        let (program, args) = ("screencapture", ["-l", "{window}", "-x", "-o", "{output}"]);

        #[cfg(not(target_os = "macos"))]
        let (program, args) = ("import", ["-silent", "-window", "{window}", "png:{output}"]);

        Self::new(program, args.iter().map(|a| a.to_string()).collect())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Capture `window_id` through the utility
    pub fn capture(&self, window_id: u32) -> Result<RgbaImage, CliFailure> {
        let output = tempfile::Builder::new()
            .prefix("visionpilot_capture_")
            .suffix(".png")
            .tempfile()
            .map_err(|e| CliFailure::Spawn(format!("failed to create temp file: {e}")))?;
        let output_path = output.path().to_string_lossy().to_string();

        let args: Vec<String> = self
            .args
            .iter()
            .map(|a| {
                a.replace(WINDOW_PLACEHOLDER, &window_id.to_string())
                    .replace(OUTPUT_PLACEHOLDER, &output_path)
            })
            .collect();

        tracing::debug!("Running {} {:?}", self.program, args);

        let mut diagnostics = tempfile::tempfile()
            .map_err(|e| CliFailure::Spawn(format!("failed to create temp file: {e}")))?;
        let child_stderr = diagnostics
            .try_clone()
            .map_err(|e| CliFailure::Spawn(format!("failed to share temp file: {e}")))?;

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(child_stderr))
            .spawn()
            .map_err(|e| CliFailure::Spawn(format!("{}: {e}", self.program)))?;

        let status = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                tracing::warn!(
                    "{} did not finish within {:?}, treating as capture failure",
                    self.program,
                    self.timeout
                );
                return Err(CliFailure::Timeout);
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(CliFailure::Spawn(e.to_string()));
            }
        };

        if !status.success() {
            return Err(CliFailure::NonZeroExit {
                code: status.code(),
                stderr: read_diagnostics(&mut diagnostics),
            });
        }

        let bytes = fs::read(output.path()).map_err(|e| CliFailure::Undecodable(e.to_string()))?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| CliFailure::Undecodable(e.to_string()))?
            .to_rgba8();

        // `output` drops here and deletes the temp file
        Ok(image)
    }
}

/// Leading part of what the utility wrote to stderr
fn read_diagnostics(file: &mut fs::File) -> String {
    const LIMIT: u64 = 4096;
    let mut bytes = Vec::new();
    if file.seek(SeekFrom::Start(0)).is_ok() {
        let _ = file.take(LIMIT).read_to_end(&mut bytes);
    }
    String::from_utf8_lossy(&bytes).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> CliCapture {
        CliCapture::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[test]
    fn test_non_zero_exit() {
        let result = sh("echo denied >&2; exit 3").capture(1);
        assert_eq!(
            result.unwrap_err(),
            CliFailure::NonZeroExit {
                code: Some(3),
                stderr: "denied".to_string()
            }
        );
    }

    #[test]
    fn test_verbose_stderr_does_not_stall() {
        // well past a pipe buffer's worth of diagnostics
        let cli = sh("head -c 200000 /dev/zero | tr '\\0' x >&2; exit 2")
            .with_timeout(Duration::from_secs(3));
        match cli.capture(1).unwrap_err() {
            CliFailure::NonZeroExit { code, stderr } => {
                assert_eq!(code, Some(2));
                assert_eq!(stderr.len(), 4096);
                assert!(stderr.chars().all(|c| c == 'x'));
            }
            other => panic!("unexpected failure {other:?}"),
        }
    }

    #[test]
    fn test_undecodable_output() {
        // exits cleanly but leaves the temp file empty
        assert!(matches!(
            sh("true").capture(1),
            Err(CliFailure::Undecodable(_))
        ));
    }

    #[test]
    fn test_timeout_is_failure() {
        let cli = sh("sleep 5").with_timeout(Duration::from_millis(100));
        assert_eq!(cli.capture(1).unwrap_err(), CliFailure::Timeout);
    }

    #[test]
    fn test_missing_program() {
        let cli = CliCapture::new("visionpilot-no-such-capture-tool", vec![]);
        assert!(matches!(cli.capture(1), Err(CliFailure::Spawn(_))));
    }

    #[test]
    fn test_decodes_written_png_and_substitutes_window() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = dir.path().join("fixture.png");
        RgbaImage::from_pixel(3, 2, image::Rgba([1, 2, 3, 255]))
            .save(&fixture)
            .unwrap();

        // only copies the fixture when the window id was substituted
        let script = format!(
            "[ \"$0\" = 77 ] && cp '{}' \"$1\"",
            fixture.display()
        );
        let cli = CliCapture::new(
            "sh",
            vec![
                "-c".to_string(),
                script,
                "{window}".to_string(),
                "{output}".to_string(),
            ],
        );

        let image = cli.capture(77).unwrap();
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.get_pixel(0, 0).0, [1, 2, 3, 255]);
    }
}
