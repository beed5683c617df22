//! VisionPilot - screen capture and input injection for automation agents
//!
//! This library gives a planning client isolated automation sessions over the
//! local desktop: full-display and per-process capture, pointer and keyboard
//! synthesis, and lifecycle events.
//!
//! ## Backends
//!
//! - Generic: portable capture and input through `xcap` and `enigo`
//! - Native: X11 via `x11rb`, with background capture and input aimed at a
//!   single process
//!
//! ## Example
//!
//! ```no_run
//! use visionpilot::{AutomationContext, ContextConfig, MouseButton};
//!
//! let mut ctx = AutomationContext::new(ContextConfig::default())?;
//! ctx.on("capture", |_| Ok(()))?;
//! let shot = ctx.capture(true)?;
//! ctx.click(100, 200, MouseButton::Left)?;
//! println!("{}", shot.message);
//! # Ok::<(), visionpilot::AutomationError>(())
//! ```

pub mod backend;
pub mod core;
pub mod error;
pub mod input;
pub mod screenshot;

pub use backend::{Backend, BackendKind, CapabilityDescriptor, create_backend};
pub use crate::core::{AutomationContext, ContextConfig, ContextStats, Event, EventKind};
pub use error::{AutomationError, Result};
pub use input::MouseButton;
pub use screenshot::Screenshot;
