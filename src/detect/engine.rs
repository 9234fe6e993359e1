use std::fs::{self, File};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use image::GrayImage;
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Tesseract page segmentation modes used by the detector.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SegmentationMode {
    /// `--psm 3`: fully automatic page segmentation.
    FullyAutomatic,
    /// `--psm 4`: a single column of text of variable sizes.
    SingleColumn,
    /// `--psm 6`: a single uniform block of text.
    UniformBlock,
}

impl SegmentationMode {
    pub fn psm(self) -> u8 {
        match self {
            Self::FullyAutomatic => 3,
            Self::SingleColumn => 4,
            Self::UniformBlock => 6,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FullyAutomatic => "fully_automatic",
            Self::SingleColumn => "single_column",
            Self::UniformBlock => "uniform_block",
        }
    }
}

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("failed to encode recognition input: {0}")]
    Encode(#[from] image::ImageError),

    #[error("recognition i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("{program} returned non-zero exit status ({status}): {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

/// Black-box text recognition: image + language + segmentation mode -> text.
pub trait RecognitionEngine: Send + Sync {
    fn recognize(
        &self,
        image: &GrayImage,
        language: &str,
        mode: SegmentationMode,
    ) -> Result<String, RecognitionError>;
}

/// Runs the `tesseract` binary once per call against a temporary PNG.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    program: PathBuf,
    timeout: Duration,
}

impl TesseractEngine {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}

impl RecognitionEngine for TesseractEngine {
    fn recognize(
        &self,
        image: &GrayImage,
        language: &str,
        mode: SegmentationMode,
    ) -> Result<String, RecognitionError> {
        let workdir = tempfile::Builder::new()
            .prefix("liquidacion_ocr_")
            .tempdir()?;
        let png_path = workdir.path().join("input.png");
        let output_base = workdir.path().join("output");
        let stderr_path = workdir.path().join("stderr.log");

        image.save(&png_path)?;

        // stdout/stderr go to files so a chatty engine can never block on a full pipe
        let mut child = Command::new(&self.program)
            .arg(&png_path)
            .arg(&output_base)
            .arg("-l")
            .arg(language)
            .arg("--psm")
            .arg(mode.psm().to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(File::create(&stderr_path)?))
            .spawn()
            .map_err(|source| RecognitionError::Spawn {
                program: self.program_name(),
                source,
            })?;

        let status = wait_with_timeout(&mut child, self.timeout).map_err(|error| match error {
            WaitError::TimedOut => RecognitionError::Timeout {
                program: self.program_name(),
                timeout: self.timeout,
            },
            WaitError::Io(error) => RecognitionError::Io(error),
        })?;

        if !status.success() {
            let stderr = fs::read_to_string(&stderr_path).unwrap_or_default();
            return Err(RecognitionError::Failed {
                program: self.program_name(),
                status,
                stderr: stderr.trim().to_string(),
            });
        }

        let raw = fs::read(output_base.with_extension("txt"))?;
        Ok(String::from_utf8_lossy(&raw)
            .replace(['\u{0000}', '\u{000C}'], "")
            .trim()
            .to_string())
    }
}

enum WaitError {
    TimedOut,
    Io(std::io::Error),
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<ExitStatus, WaitError> {
    let started = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {
                if started.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(WaitError::TimedOut);
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(error) => return Err(WaitError::Io(error)),
        }
    }
}

/// Languages reported by `tesseract --list-langs`, or `None` if the binary can't be run.
pub fn installed_languages(program: &str) -> Option<Vec<String>> {
    let output = Command::new(program).arg("--list-langs").output().ok()?;
    if !output.status.success() {
        return None;
    }

    // header line is "List of available languages in ...:"
    let stdout = String::from_utf8_lossy(&output.stdout);
    Some(
        stdout
            .lines()
            .skip(1)
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToOwned::to_owned)
            .collect(),
    )
}
