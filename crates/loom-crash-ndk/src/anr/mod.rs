// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! ANR (Application Not Responding) detection.
//!
//! A host-owned buffer carries a liveness token that the monitored thread
//! advances. While reporting is enabled a dedicated monitor thread polls the
//! token and invokes the report hook once per hang episode.

mod buffer;
mod monitor;

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::AnrConfig;
use crate::error::{NativeError, Result};

pub use buffer::AnrBuffer;
use monitor::{MonitorSettings, StopSignal};

const MONITOR_THREAD_NAME: &str = "loom-anr-monitor";

struct Installed {
	buffer: AnrBuffer,
	signal: Arc<StopSignal>,
	thread: JoinHandle<()>,
}

/// Owns the installed/uninstalled state of ANR reporting.
///
/// `Uninstalled -> Installed -> Uninstalled`, re-enabling allowed.
#[derive(Default)]
pub struct HandlerController {
	state: Mutex<Option<Installed>>,
}

impl HandlerController {
	pub fn new() -> Self {
		Self::default()
	}

	/// Starts monitoring `buffer`, calling `on_hang` from the monitor thread
	/// for every detected hang.
	///
	/// Returns `Ok(false)` without touching the running monitor when reporting
	/// is already enabled.
	pub fn enable<F>(&self, buffer: AnrBuffer, config: &AnrConfig, on_hang: F) -> Result<bool>
	where
		F: Fn() + Send + 'static,
	{
		let mut state = self.state.lock();
		if state.is_some() {
			debug!("ANR reporting already enabled");
			return Ok(false);
		}

		let signal = Arc::new(StopSignal::default());
		let settings = MonitorSettings {
			threshold: config.threshold(),
			poll_interval: config.poll_interval(),
		};
		let thread = {
			let signal = Arc::clone(&signal);
			thread::Builder::new()
				.name(MONITOR_THREAD_NAME.to_string())
				.spawn(move || monitor::run(buffer, signal, settings, on_hang))
				.map_err(NativeError::MonitorSpawn)?
		};

		info!(buffer = ?buffer.as_ptr(), "ANR reporting enabled");
		*state = Some(Installed { buffer, signal, thread });
		Ok(true)
	}

	/// Stops the monitor and releases the buffer.
	///
	/// Waits for the monitor thread to exit, unless called from that thread.
	/// Returns `false` when reporting was not enabled.
	pub fn disable(&self) -> bool {
		let Some(installed) = self.state.lock().take() else {
			return false;
		};

		installed.signal.stop();
		if installed.thread.thread().id() == thread::current().id() {
			debug!("ANR reporting disabled from the monitor thread");
		} else if installed.thread.join().is_err() {
			debug!("ANR monitor thread exited with a panic");
		}
		info!(buffer = ?installed.buffer.as_ptr(), "ANR reporting disabled");
		true
	}

	pub fn is_installed(&self) -> bool {
		self.state.lock().is_some()
	}
}

impl Drop for HandlerController {
	fn drop(&mut self) {
		self.disable();
	}
}

impl std::fmt::Debug for HandlerController {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HandlerController")
			.field("installed", &self.is_installed())
			.finish()
	}
}
