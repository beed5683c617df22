//! Capture fallback chain
//!
//! Each capture walks an explicit state machine:
//!
//! ```text
//! Created --(high-level ok)--------------------------------> captured
//! Created --(trigger)--> TriedHighLevel --(cli ok)---------> captured
//!                        TriedHighLevel --(cli failure)--> TriedCli -> Failed
//! ```
//!
//! The high-level stage is rasterize + serialize. Any of its failure shapes
//! (rasterize error, null destination, rejected output, encoder error)
//! triggers the CLI stage. Exhausting the chain is an expected outcome under
//! compositor contention and is reported as "no image", never as imagery
//! taken from some other window.

use std::fmt;

use image::RgbaImage;

use super::cli::CliCapture;
use super::{RawImage, SerializeOutcome, serialize};

/// Why the high-level stage handed over to the CLI stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackTrigger {
    RasterizeFailed(String),
    NullDestination,
    Rejected,
    Raised(String),
}

impl fmt::Display for FallbackTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackTrigger::RasterizeFailed(e) => write!(f, "rasterize failed: {e}"),
            FallbackTrigger::NullDestination => f.write_str("no image destination for buffer"),
            FallbackTrigger::Rejected => f.write_str("serialization produced no usable output"),
            FallbackTrigger::Raised(e) => write!(f, "encoder error: {e}"),
        }
    }
}

/// Why the CLI stage failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliFailure {
    Spawn(String),
    Timeout,
    NonZeroExit { code: Option<i32>, stderr: String },
    Undecodable(String),
}

impl fmt::Display for CliFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliFailure::Spawn(e) => write!(f, "could not run capture utility: {e}"),
            CliFailure::Timeout => f.write_str("capture utility timed out"),
            CliFailure::NonZeroExit { code, stderr } => match code {
                Some(code) => write!(f, "capture utility exited with {code}: {stderr}"),
                None => write!(f, "capture utility killed by signal: {stderr}"),
            },
            CliFailure::Undecodable(e) => write!(f, "capture output undecodable: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainState {
    Created,
    TriedHighLevel(FallbackTrigger),
    TriedCli(CliFailure),
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureSource {
    HighLevel,
    Cli,
}

/// A successfully captured window
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub image: RgbaImage,
    pub png: Vec<u8>,
    pub source: CaptureSource,
}

/// One walk through the chain for one window
#[derive(Debug, Clone)]
pub struct CaptureChain {
    window_id: u32,
    trail: Vec<ChainState>,
}

impl CaptureChain {
    pub fn new(window_id: u32) -> Self {
        Self {
            window_id,
            trail: vec![ChainState::Created],
        }
    }

    pub fn state(&self) -> &ChainState {
        // never empty: seeded with Created
        self.trail.last().unwrap_or(&ChainState::Created)
    }

    /// Every state visited, in order
    pub fn trail(&self) -> &[ChainState] {
        &self.trail
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state(), ChainState::Failed)
    }

    fn high_level_failed(&mut self, trigger: FallbackTrigger) {
        debug_assert_eq!(self.state(), &ChainState::Created);
        tracing::warn!(
            "High-level capture of window {} failed ({}), falling back to CLI",
            self.window_id,
            trigger
        );
        self.trail.push(ChainState::TriedHighLevel(trigger));
    }

    fn cli_failed(&mut self, failure: CliFailure) {
        debug_assert!(matches!(self.state(), ChainState::TriedHighLevel(_)));
        tracing::warn!("CLI capture of window {} failed: {}", self.window_id, failure);
        self.trail.push(ChainState::TriedCli(failure));
        self.trail.push(ChainState::Failed);
    }

    /// Drive the chain to completion for `window_id`.
    ///
    /// `rasterize` performs the compositor imaging call; `cli` is only run
    /// after the high-level stage has failed.
    pub fn run<F>(window_id: u32, rasterize: F, cli: &CliCapture) -> CaptureOutcome
    where
        F: FnOnce(u32) -> anyhow::Result<RawImage>,
    {
        Self::run_with(window_id, rasterize, serialize, cli)
    }

    /// [`run`](Self::run) with the serialization step supplied by the caller
    pub fn run_with<F, S>(
        window_id: u32,
        rasterize: F,
        serialize: S,
        cli: &CliCapture,
    ) -> CaptureOutcome
    where
        F: FnOnce(u32) -> anyhow::Result<RawImage>,
        S: FnOnce(RawImage) -> SerializeOutcome,
    {
        let mut chain = Self::new(window_id);

        let trigger = match rasterize(window_id) {
            Err(e) => FallbackTrigger::RasterizeFailed(format!("{e:#}")),
            Ok(raw) => match serialize(raw) {
                SerializeOutcome::Encoded { image, png } => {
                    return CaptureOutcome {
                        captured: Some(CapturedImage {
                            image,
                            png,
                            source: CaptureSource::HighLevel,
                        }),
                        chain,
                    };
                }
                SerializeOutcome::NullDestination => FallbackTrigger::NullDestination,
                SerializeOutcome::Rejected => FallbackTrigger::Rejected,
                SerializeOutcome::Raised(e) => FallbackTrigger::Raised(e),
            },
        };
        chain.high_level_failed(trigger);

        let cli_result = cli.capture(window_id).and_then(|image| {
            super::encode_png(&image)
                .map(|png| (image, png))
                .map_err(|e| CliFailure::Undecodable(e.to_string()))
        });

        match cli_result {
            Ok((image, png)) => {
                tracing::info!("Captured window {} via {}", window_id, cli.program());
                CaptureOutcome {
                    captured: Some(CapturedImage {
                        image,
                        png,
                        source: CaptureSource::Cli,
                    }),
                    chain,
                }
            }
            Err(failure) => {
                chain.cli_failed(failure);
                CaptureOutcome {
                    captured: None,
                    chain,
                }
            }
        }
    }
}

/// Result of [`CaptureChain::run`]
#[derive(Debug)]
pub struct CaptureOutcome {
    pub captured: Option<CapturedImage>,
    pub chain: CaptureChain,
}
