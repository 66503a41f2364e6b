// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The monitor loop and the hang detection it drives.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use super::buffer::AnrBuffer;

/// Tracks the liveness token and decides when a hang should be reported.
///
/// At most one report is produced per hang episode; the detector re-arms once
/// the token advances again.
#[derive(Debug)]
pub(crate) struct HangDetector {
	threshold: Duration,
	last_token: u64,
	last_change: Instant,
	reported: bool,
}

impl HangDetector {
	pub(crate) fn new(threshold: Duration, token: u64, now: Instant) -> Self {
		Self {
			threshold,
			last_token: token,
			last_change: now,
			reported: false,
		}
	}

	/// Feeds one observation. Returns `true` when a hang should be reported.
	pub(crate) fn observe(&mut self, token: u64, now: Instant) -> bool {
		if token != self.last_token {
			if self.reported {
				debug!(token, "monitored thread recovered");
			}
			self.last_token = token;
			self.last_change = now;
			self.reported = false;
			return false;
		}

		if self.reported {
			return false;
		}
		if now.saturating_duration_since(self.last_change) >= self.threshold {
			self.reported = true;
			return true;
		}
		false
	}
}

/// Wakes the monitor out of its poll sleep when reporting is disabled.
#[derive(Debug, Default)]
pub(crate) struct StopSignal {
	stopped: Mutex<bool>,
	cvar: Condvar,
}

impl StopSignal {
	pub(crate) fn stop(&self) {
		*self.stopped.lock() = true;
		self.cvar.notify_all();
	}

	pub(crate) fn is_stopped(&self) -> bool {
		*self.stopped.lock()
	}

	/// Sleeps for up to `timeout`. Returns `true` once a stop was requested.
	pub(crate) fn wait(&self, timeout: Duration) -> bool {
		let mut stopped = self.stopped.lock();
		if !*stopped {
			self.cvar.wait_for(&mut stopped, timeout);
		}
		*stopped
	}
}

pub(crate) struct MonitorSettings {
	pub(crate) threshold: Duration,
	pub(crate) poll_interval: Duration,
}

/// Body of the monitor thread. Runs until `signal` is stopped.
pub(crate) fn run<F>(buffer: AnrBuffer, signal: Arc<StopSignal>, settings: MonitorSettings, on_hang: F)
where
	F: Fn(),
{
	info!(
		threshold_ms = settings.threshold.as_millis() as u64,
		poll_interval_ms = settings.poll_interval.as_millis() as u64,
		"ANR monitor started"
	);

	let mut detector = HangDetector::new(settings.threshold, buffer.load(), Instant::now());
	while !signal.wait(settings.poll_interval) {
		let hung = detector.observe(buffer.load(), Instant::now());
		if !hung {
			continue;
		}
		if signal.is_stopped() {
			break;
		}

		warn!(threshold_ms = settings.threshold.as_millis() as u64, "monitored thread unresponsive, reporting ANR");
		if catch_unwind(AssertUnwindSafe(&on_hang)).is_err() {
			warn!("ANR report panicked, monitor continues");
		}
	}

	info!("ANR monitor stopped");
}
