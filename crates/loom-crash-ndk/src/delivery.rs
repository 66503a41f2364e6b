// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Hand-off point between the reporting pipeline and whatever persists or
//! sends the finished event.

use std::ffi::c_int;
use std::fmt;

use loom_crash_core::EventRecord;
use tracing::{debug, warn};

/// Result of handing an event to a [`Delivery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryStatus {
	/// The event was accepted by the transport.
	Delivered,
	/// The event could not be sent now but was kept for a later attempt.
	Undelivered,
	/// The event was lost.
	Failure,
}

impl DeliveryStatus {
	pub fn code(self) -> c_int {
		match self {
			DeliveryStatus::Delivered => 0,
			DeliveryStatus::Undelivered => 1,
			DeliveryStatus::Failure => 2,
		}
	}

	/// Maps a C status code; anything unrecognised counts as a failure.
	pub fn from_code(code: c_int) -> Self {
		match code {
			0 => DeliveryStatus::Delivered,
			1 => DeliveryStatus::Undelivered,
			_ => DeliveryStatus::Failure,
		}
	}
}

impl fmt::Display for DeliveryStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			DeliveryStatus::Delivered => "delivered",
			DeliveryStatus::Undelivered => "undelivered",
			DeliveryStatus::Failure => "failure",
		};
		f.write_str(s)
	}
}

/// Receives every report that survives the on-error chain.
///
/// Called on the thread that produced the report: the caller of `notify`, or
/// the ANR monitor thread.
pub trait Delivery: Send + Sync {
	fn deliver(&self, event: EventRecord) -> DeliveryStatus;
}

impl<F> Delivery for F
where
	F: Fn(EventRecord) -> DeliveryStatus + Send + Sync,
{
	fn deliver(&self, event: EventRecord) -> DeliveryStatus {
		self(event)
	}
}

/// Default delivery: logs the serialized event and reports it delivered.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDelivery;

impl Delivery for TracingDelivery {
	fn deliver(&self, event: EventRecord) -> DeliveryStatus {
		match event.to_json() {
			Ok(json) => {
				debug!(
					error_class = event.error_class().unwrap_or_default(),
					severity = %event.severity,
					unhandled = event.unhandled,
					event = %json,
					"event ready for delivery"
				);
				DeliveryStatus::Delivered
			}
			Err(e) => {
				warn!(error = %e, "failed to serialize event");
				DeliveryStatus::Failure
			}
		}
	}
}

/// Host-supplied delivery function.
///
/// The pointer is only valid for the duration of the call; the host must copy
/// whatever it keeps. The return value is a [`DeliveryStatus::code`].
pub type DeliveryFn = extern "C" fn(event: *mut EventRecord) -> c_int;

/// Adapts a [`DeliveryFn`] to [`Delivery`].
#[derive(Clone, Copy)]
pub struct ExternDelivery {
	func: DeliveryFn,
}

impl ExternDelivery {
	pub fn new(func: DeliveryFn) -> Self {
		Self { func }
	}
}

impl fmt::Debug for ExternDelivery {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ExternDelivery")
			.field("func", &(self.func as *const ()))
			.finish()
	}
}

impl Delivery for ExternDelivery {
	fn deliver(&self, mut event: EventRecord) -> DeliveryStatus {
		let code = (self.func)(&mut event);
		DeliveryStatus::from_code(code)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	extern "C" fn undelivered(event: *mut EventRecord) -> c_int {
		assert!(!event.is_null());
		1
	}

	#[test]
	fn test_status_codes() {
		for status in [
			DeliveryStatus::Delivered,
			DeliveryStatus::Undelivered,
			DeliveryStatus::Failure,
		] {
			assert_eq!(DeliveryStatus::from_code(status.code()), status);
		}
		assert_eq!(DeliveryStatus::from_code(-7), DeliveryStatus::Failure);
	}

	#[test]
	fn test_tracing_delivery_accepts_events() {
		let mut event = EventRecord::new();
		event.set_error("IOException", Some("disk full")).unwrap();
		assert_eq!(TracingDelivery.deliver(event), DeliveryStatus::Delivered);
	}

	#[test]
	fn test_extern_delivery_maps_code() {
		let delivery = ExternDelivery::new(undelivered);
		assert_eq!(delivery.deliver(EventRecord::new()), DeliveryStatus::Undelivered);
	}

	#[test]
	fn test_closure_delivery() {
		let delivery = |event: EventRecord| {
			if event.unhandled {
				DeliveryStatus::Undelivered
			} else {
				DeliveryStatus::Delivered
			}
		};
		assert_eq!(delivery.deliver(EventRecord::new()), DeliveryStatus::Delivered);
	}
}
