//! # turn-capture-cpal
//!
//! Cross-platform capture host for turn-capture, built on cpal.
//!
//! Provides:
//! - `CpalCaptureHost`: `CaptureHost` over a cpal input device
//! - `CpalInput`: the live device stream, owned by a dedicated thread
//! - `CpalSource`: routes channel 0 of the device into a processor node
//! - `list_input_devices`: input device enumeration
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use turn_capture_core::{MicrophoneSource, RecorderConfig};
//! use turn_capture_cpal::CpalCaptureHost;
//!
//! let host = Arc::new(CpalCaptureHost::new(None)?);
//! let mic = MicrophoneSource::new(host, None, RecorderConfig::default());
//! let mut reader = mic.attach("node-1", None).await?;
//! ```

pub mod devices;
pub mod host;
pub mod input;
pub mod source;

pub use devices::{list_input_devices, InputDeviceInfo};
pub use host::CpalCaptureHost;
pub use input::CpalInput;
pub use source::CpalSource;
