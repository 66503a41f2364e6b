// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the native agent.
//!
//! None of these reach the host through the C surface; the boundary logs them
//! and carries on.

use loom_crash_core::CrashError;
use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for native agent operations.
pub type Result<T> = std::result::Result<T, NativeError>;

/// Errors that can occur in the native agent.
#[derive(Debug, Error)]
pub enum NativeError {
	/// The client has been closed.
	#[error("native client has been closed")]
	ClientClosed,

	/// Configuration could not be loaded.
	#[error("configuration error: {0}")]
	Config(#[from] ConfigError),

	/// Event data was rejected by the model.
	#[error("event error: {0}")]
	Event(#[from] CrashError),

	/// The ANR monitor thread could not be started.
	#[error("failed to spawn ANR monitor: {0}")]
	MonitorSpawn(#[source] std::io::Error),
}
