// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ordered registry of callbacks that may mutate or veto a record.
//!
//! The same chain type backs on-error callbacks (over
//! [`EventRecord`](loom_crash_core::EventRecord)) and on-breadcrumb callbacks
//! (over [`Breadcrumb`](loom_crash_core::Breadcrumb)).

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

/// Token returned on registration; the only way to unregister a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(u64);

impl CallbackId {
	pub fn from_raw(raw: u64) -> Self {
		Self(raw)
	}

	pub fn as_raw(self) -> u64 {
		self.0
	}
}

impl fmt::Display for CallbackId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// A callback run against a record before it is accepted.
///
/// Returning `false` vetoes the record. Callbacks on the ANR path run on the
/// monitor thread, so they must not block on the monitored thread.
pub trait Callback<T>: Send + Sync {
	fn evaluate(&self, record: &mut T) -> bool;
}

impl<T, F> Callback<T> for F
where
	F: Fn(&mut T) -> bool + Send + Sync,
{
	fn evaluate(&self, record: &mut T) -> bool {
		self(record)
	}
}

struct CallbackEntry<T> {
	id: CallbackId,
	callback: Arc<dyn Callback<T>>,
}

pub struct CallbackChain<T> {
	entries: RwLock<Vec<CallbackEntry<T>>>,
	/// Starts at 1 so that 0 never names a live callback on the C surface.
	next_id: AtomicU64,
}

impl<T: 'static> CallbackChain<T> {
	pub fn new() -> Self {
		Self {
			entries: RwLock::new(Vec::new()),
			next_id: AtomicU64::new(1),
		}
	}

	/// Appends `callback` to the end of the chain.
	pub fn add(&self, callback: impl Callback<T> + 'static) -> CallbackId {
		let id = CallbackId(self.next_id.fetch_add(1, Ordering::Relaxed));
		self.entries.write().push(CallbackEntry {
			id,
			callback: Arc::new(callback),
		});
		debug!(callback_id = %id, "callback registered");
		id
	}

	/// Unregisters `id`. Unknown or already-removed ids are ignored.
	pub fn remove(&self, id: CallbackId) -> bool {
		let mut entries = self.entries.write();
		let before = entries.len();
		entries.retain(|entry| entry.id != id);
		let removed = entries.len() != before;
		if removed {
			debug!(callback_id = %id, "callback removed");
		}
		removed
	}

	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}

	/// Runs every callback in registration order.
	///
	/// Returns `false` as soon as one callback vetoes; later callbacks are not
	/// invoked. The registry lock is released before the first callback runs,
	/// so callbacks may add or remove callbacks; such changes apply to the next
	/// run. A panicking callback is logged and skipped.
	pub fn run(&self, record: &mut T) -> bool {
		let entries: Vec<(CallbackId, Arc<dyn Callback<T>>)> = self
			.entries
			.read()
			.iter()
			.map(|entry| (entry.id, Arc::clone(&entry.callback)))
			.collect();

		for (id, callback) in entries {
			match catch_unwind(AssertUnwindSafe(|| callback.evaluate(record))) {
				Ok(true) => {}
				Ok(false) => {
					debug!(callback_id = %id, "callback vetoed record");
					return false;
				}
				Err(_) => {
					warn!(callback_id = %id, "callback panicked, skipping");
				}
			}
		}
		true
	}
}

impl<T: 'static> Default for CallbackChain<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: 'static> fmt::Debug for CallbackChain<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CallbackChain")
			.field("len", &self.len())
			.finish()
	}
}
