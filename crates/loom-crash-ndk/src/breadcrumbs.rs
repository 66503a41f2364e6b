// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded, thread-safe breadcrumb log.

use std::collections::VecDeque;

use chrono::Utc;
use loom_crash_core::{Breadcrumb, BreadcrumbType};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::callbacks::CallbackChain;

/// Append-only log of the most recent breadcrumbs.
///
/// When the log is full the oldest entry is evicted before the new one is
/// appended. Concurrent appends are serialized; each gets a timestamp no
/// earlier than the entry before it.
pub struct BreadcrumbLog {
	entries: Mutex<VecDeque<Breadcrumb>>,
	capacity: usize,
	on_breadcrumb: CallbackChain<Breadcrumb>,
}

impl BreadcrumbLog {
	/// Creates a log holding at most `capacity` entries (at least one).
	pub fn new(capacity: usize) -> Self {
		let capacity = capacity.max(1);
		Self {
			entries: Mutex::new(VecDeque::with_capacity(capacity)),
			capacity,
			on_breadcrumb: CallbackChain::new(),
		}
	}

	/// Records a breadcrumb with the given message and type.
	///
	/// Returns `false` if the message is empty or an on-breadcrumb callback
	/// vetoed it.
	pub fn leave(&self, message: &str, breadcrumb_type: BreadcrumbType) -> bool {
		match Breadcrumb::new(message, breadcrumb_type) {
			Ok(crumb) => self.push(crumb),
			Err(e) => {
				debug!(error = %e, "ignoring breadcrumb");
				false
			}
		}
	}

	/// Runs the on-breadcrumb callbacks and appends the result, stamped with the
	/// current time.
	pub fn push(&self, mut crumb: Breadcrumb) -> bool {
		if !self.on_breadcrumb.run(&mut crumb) {
			debug!(breadcrumb_type = %crumb.breadcrumb_type, "breadcrumb vetoed by callback");
			return false;
		}
		self.append(crumb);
		true
	}

	/// Appends without running the on-breadcrumb callbacks. Used for
	/// breadcrumbs the agent records about its own reports.
	pub(crate) fn append(&self, mut crumb: Breadcrumb) {
		let mut entries = self.entries.lock();
		let now = Utc::now();
		crumb.timestamp = match entries.back() {
			Some(last) if last.timestamp > now => last.timestamp,
			_ => now,
		};
		if entries.len() >= self.capacity {
			entries.pop_front();
		}
		trace!(breadcrumb_type = %crumb.breadcrumb_type, len = entries.len() + 1, "breadcrumb recorded");
		entries.push_back(crumb);
	}

	/// Copies the current entries, oldest first.
	pub fn snapshot(&self) -> Vec<Breadcrumb> {
		self.entries.lock().iter().cloned().collect()
	}

	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	pub fn clear(&self) {
		self.entries.lock().clear();
	}

	/// Callbacks run against every breadcrumb before it is recorded.
	pub fn callbacks(&self) -> &CallbackChain<Breadcrumb> {
		&self.on_breadcrumb
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use std::collections::HashSet;
	use std::sync::Arc;
	use std::thread;

	#[test]
	fn test_leave_and_snapshot() {
		let log = BreadcrumbLog::new(10);
		assert!(log.leave("opened settings", BreadcrumbType::Navigation));
		assert!(log.leave("toggled dark mode", BreadcrumbType::User));

		let crumbs = log.snapshot();
		assert_eq!(crumbs.len(), 2);
		assert_eq!(crumbs[0].message, "opened settings");
		assert_eq!(crumbs[1].breadcrumb_type, BreadcrumbType::User);
	}

	#[test]
	fn test_capacity_eviction() {
		let log = BreadcrumbLog::new(3);
		for i in 1..=4 {
			log.leave(&format!("msg {i}"), BreadcrumbType::Log);
		}

		assert_eq!(log.len(), 3);
		let crumbs = log.snapshot();
		assert_eq!(crumbs[0].message, "msg 2");
		assert_eq!(crumbs[2].message, "msg 4");
	}

	#[test]
	fn test_zero_capacity_is_clamped() {
		let log = BreadcrumbLog::new(0);
		log.leave("a", BreadcrumbType::Log);
		log.leave("b", BreadcrumbType::Log);
		assert_eq!(log.capacity(), 1);
		assert_eq!(log.snapshot()[0].message, "b");
	}

	#[test]
	fn test_empty_message_ignored() {
		let log = BreadcrumbLog::new(5);
		assert!(!log.leave("", BreadcrumbType::Manual));
		assert!(log.is_empty());
	}

	#[test]
	fn test_callback_can_veto_and_rewrite() {
		let log = BreadcrumbLog::new(5);
		log.callbacks().add(|crumb: &mut Breadcrumb| crumb.breadcrumb_type != BreadcrumbType::Request);
		log.callbacks().add(|crumb: &mut Breadcrumb| {
			crumb.metadata.insert("screen".into(), "home".into());
			true
		});

		assert!(!log.leave("GET /api/users", BreadcrumbType::Request));
		assert!(log.leave("tapped refresh", BreadcrumbType::User));

		let crumbs = log.snapshot();
		assert_eq!(crumbs.len(), 1);
		assert_eq!(crumbs[0].metadata["screen"], "home");
	}

	#[test]
	fn test_append_skips_callbacks_but_evicts() {
		let log = BreadcrumbLog::new(2);
		log.callbacks().add(|_: &mut Breadcrumb| false);
		assert!(!log.leave("user action", BreadcrumbType::User));

		for class in ["IOException", "OOM", "SIGSEGV"] {
			log.append(Breadcrumb::new(class, BreadcrumbType::Error).unwrap());
		}

		let crumbs = log.snapshot();
		assert_eq!(crumbs.len(), 2);
		assert_eq!(crumbs[0].message, "OOM");
		assert_eq!(crumbs[1].message, "SIGSEGV");
		assert!(crumbs[0].timestamp <= crumbs[1].timestamp);
	}

	#[test]
	fn test_timestamps_non_decreasing() {
		let log = BreadcrumbLog::new(100);
		for i in 0..50 {
			log.leave(&format!("crumb {i}"), BreadcrumbType::State);
		}
		let crumbs = log.snapshot();
		assert!(crumbs.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
	}

	#[test]
	fn test_concurrent_appends_are_not_lost() {
		const THREADS: usize = 8;
		const PER_THREAD: usize = 1_000;

		for capacity in [THREADS * PER_THREAD, 500] {
			let log = Arc::new(BreadcrumbLog::new(capacity));
			let handles: Vec<_> = (0..THREADS)
				.map(|t| {
					let log = Arc::clone(&log);
					thread::spawn(move || {
						for i in 0..PER_THREAD {
							log.leave(&format!("t{t}-{i}"), BreadcrumbType::Log);
						}
					})
				})
				.collect();
			for handle in handles {
				handle.join().unwrap();
			}

			let crumbs = log.snapshot();
			assert_eq!(crumbs.len(), capacity.min(THREADS * PER_THREAD));
			let unique: HashSet<_> = crumbs.iter().map(|c| c.message.to_string()).collect();
			assert_eq!(unique.len(), crumbs.len());
		}
	}

	proptest! {
		#[test]
		fn log_keeps_most_recent_entries(capacity in 1usize..20, appends in 0usize..60) {
			let log = BreadcrumbLog::new(capacity);
			for i in 0..appends {
				log.leave(&format!("{i}"), BreadcrumbType::Manual);
			}

			let crumbs = log.snapshot();
			prop_assert_eq!(crumbs.len(), appends.min(capacity));
			let first = appends.saturating_sub(capacity);
			for (offset, crumb) in crumbs.iter().enumerate() {
				let expected = (first + offset).to_string();
				prop_assert_eq!(crumb.message.as_str(), expected.as_str());
			}
		}
	}
}
