//! Backend selection
//!
//! Backends are built fresh for every request; nothing is cached, so two
//! contexts never share a display connection.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use super::generic::{GENERIC_CAPABILITIES, GenericBackend};
use super::native::{NATIVE_CAPABILITIES, NativeBackend, X11Display};
use super::{Backend, CapabilityDescriptor};
use crate::error::{AutomationError, Result};

/// Requested backend kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Native when the display bridge loads, generic otherwise
    #[default]
    Auto,
    Generic,
    Native,
}

impl FromStr for BackendKind {
    type Err = AutomationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(BackendKind::Auto),
            "generic" | "pyautogui" => Ok(BackendKind::Generic),
            "native" | "macos" => Ok(BackendKind::Native),
            _ => Err(AutomationError::UnsupportedBackend(s.to_string())),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Auto => "auto",
            BackendKind::Generic => "generic",
            BackendKind::Native => "native",
        };
        f.write_str(name)
    }
}

/// Build a backend of the requested kind
pub fn create_backend(
    kind: BackendKind,
    action_delay: Duration,
    capture_dir: &Path,
) -> Result<Box<dyn Backend>> {
    match kind {
        BackendKind::Generic => Ok(Box::new(GenericBackend::new(action_delay, capture_dir))),
        BackendKind::Native => {
            let backend = NativeBackend::connect(action_delay, capture_dir)
                .map_err(|e| AutomationError::Backend(e.context("native backend unavailable")))?;
            tracing::info!("Using native backend");
            Ok(Box::new(backend))
        }
        BackendKind::Auto => match NativeBackend::connect(action_delay, capture_dir) {
            Ok(backend) => {
                tracing::info!("Auto-selected native backend");
                Ok(Box::new(backend))
            }
            Err(e) => {
                tracing::info!("Native backend unavailable ({:#}), using generic backend", e);
                Ok(Box::new(GenericBackend::new(action_delay, capture_dir)))
            }
        },
    }
}

/// Whether the native display bridge can be loaded right now
fn native_available() -> bool {
    match X11Display::connect() {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!("Native backend unavailable: {:#}", e);
            false
        }
    }
}

/// The concrete kind `Auto` resolves to on this machine
pub fn auto_select() -> BackendKind {
    if native_available() {
        BackendKind::Native
    } else {
        BackendKind::Generic
    }
}

/// Concrete backend kinds that can be created on this machine
pub fn available_backends() -> Vec<BackendKind> {
    let mut kinds = vec![BackendKind::Generic];
    if native_available() {
        kinds.push(BackendKind::Native);
    }
    kinds
}

/// Capability descriptor of every concrete kind, available or not
pub fn backend_info() -> Vec<(BackendKind, CapabilityDescriptor)> {
    vec![
        (BackendKind::Generic, GENERIC_CAPABILITIES),
        (BackendKind::Native, NATIVE_CAPABILITIES),
    ]
}

/// Render the capability comparison as a plain-text table
pub fn comparison_table() -> String {
    let yes_no = |b: bool| if b { "yes" } else { "no" };
    let mut out = format!(
        "{:<12} {:<10} {:<10} {:<10} {:<12} {:<8}\n",
        "backend", "bg-capture", "bg-input", "speed", "permissions", "platform"
    );

    for (kind, caps) in backend_info() {
        let permissions = match (caps.requires_accessibility, caps.requires_screen_recording) {
            (true, true) => "a11y+screen",
            (true, false) => "a11y",
            (false, true) => "screen",
            (false, false) => "none",
        };
        out.push_str(&format!(
            "{:<12} {:<10} {:<10} {:<10} {:<12} {:<8}\n",
            kind.to_string(),
            yes_no(caps.background_capture),
            yes_no(caps.background_input),
            format!("{}x", caps.performance_multiplier),
            permissions,
            caps.platform
        ));
    }

    out
}
