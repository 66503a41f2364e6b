// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};

/// Borrowed view of the shared liveness buffer.
///
/// The first eight bytes hold a `u64` token that the monitored thread advances
/// while it is responsive. The buffer is owned by the host.
#[derive(Debug, Clone, Copy)]
pub struct AnrBuffer {
	token: NonNull<AtomicU64>,
}

// SAFETY: the buffer is only ever read through `AtomicU64::load`, and the host
// guarantees it stays mapped while reporting is enabled.
unsafe impl Send for AnrBuffer {}
// SAFETY: see above; shared access is atomic loads only.
unsafe impl Sync for AnrBuffer {}

impl AnrBuffer {
	/// Wraps a host pointer. Returns `None` for a null or misaligned pointer.
	///
	/// # Safety
	///
	/// A non-null `ptr` must point to at least eight readable bytes that stay
	/// valid until reporting is disabled, and must only be written with atomic
	/// or otherwise word-sized stores.
	pub unsafe fn from_raw(ptr: *mut c_void) -> Option<Self> {
		let token = NonNull::new(ptr.cast::<AtomicU64>())?;
		if token.as_ptr() as usize % std::mem::align_of::<AtomicU64>() != 0 {
			return None;
		}
		Some(Self { token })
	}

	/// Wraps a Rust-owned counter.
	pub fn from_atomic(token: &'static AtomicU64) -> Self {
		Self {
			token: NonNull::from(token),
		}
	}

	pub fn load(&self) -> u64 {
		// SAFETY: alignment and validity were established at construction.
		unsafe { self.token.as_ref() }.load(Ordering::Acquire)
	}

	pub fn as_ptr(&self) -> *mut c_void {
		self.token.as_ptr().cast()
	}
}
