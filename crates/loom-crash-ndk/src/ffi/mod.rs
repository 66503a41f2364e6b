// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! C-callable surface.
//!
//! One process-wide [`NativeClient`] is installed by [`bugsnag_init`] and
//! removed by [`bugsnag_close`]; calls made while no client is installed do
//! nothing. Nothing here reports failure to the caller: errors are logged and
//! panics are caught at the boundary.

mod accessors;

pub use accessors::*;

use std::borrow::Cow;
use std::ffi::{c_char, c_int, c_void, CStr};
use std::panic::{catch_unwind, AssertUnwindSafe};

use loom_crash_core::{BreadcrumbType, EventRecord, Severity};
use parking_lot::{const_rwlock, RwLock};
use tracing::{debug, error, warn};

use crate::anr::AnrBuffer;
use crate::callbacks::CallbackId;
use crate::client::{NativeClient, RuntimeContext};
use crate::config::{load_config, NativeConfig};
use crate::delivery::{DeliveryFn, ExternDelivery, TracingDelivery};
use crate::logging;

/// Host on-error callback. Returning `false` vetoes the report.
///
/// The event pointer is only valid for the duration of the call.
pub type OnErrorFn = extern "C" fn(event: *mut EventRecord) -> bool;

static CLIENT: RwLock<Option<NativeClient>> = const_rwlock(None);

/// Runs `f` with a clone of the installed client; the registry lock is not
/// held while `f` runs.
fn with_client<R>(f: impl FnOnce(&NativeClient) -> R) -> Option<R> {
	let client = CLIENT.read().clone();
	match client {
		Some(client) => Some(f(&client)),
		None => {
			debug!("native client not initialized, ignoring call");
			None
		}
	}
}

/// Catches panics so they never unwind into the host.
fn guard<R>(entry_point: &'static str, fallback: R, f: impl FnOnce() -> R) -> R {
	match catch_unwind(AssertUnwindSafe(f)) {
		Ok(value) => value,
		Err(_) => {
			error!(entry_point, "panic caught at the C boundary");
			fallback
		}
	}
}

/// Borrows a C string. Null gives `None`; invalid UTF-8 is replaced.
///
/// # Safety
/// A non-null `ptr` must point to a NUL-terminated string that outlives `'a`.
pub(crate) unsafe fn opt_str<'a>(ptr: *const c_char) -> Option<Cow<'a, str>> {
	if ptr.is_null() {
		None
	} else {
		Some(CStr::from_ptr(ptr).to_string_lossy())
	}
}

/// Installs the process-wide client. Calling it again while a client is
/// installed does nothing.
///
/// # Safety
/// `runtime_context` is stored and never dereferenced; it may be null.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_init(runtime_context: *mut c_void) {
	guard("bugsnag_init", (), || {
		let mut slot = CLIENT.write();
		if slot.is_some() {
			debug!("native client already initialized");
			return;
		}

		let config = load_config().unwrap_or_else(|e| {
			warn!(error = %e, "invalid native configuration, using defaults");
			NativeConfig::default()
		});
		logging::init(&config.logging);

		match NativeClient::builder()
			.config(config)
			.runtime_context(RuntimeContext::from_raw(runtime_context))
			.build()
		{
			Ok(client) => *slot = Some(client),
			Err(e) => error!(error = %e, "failed to initialize native client"),
		}
	})
}

/// Closes and removes the process-wide client. Stops ANR monitoring.
#[no_mangle]
pub extern "C" fn bugsnag_close() {
	guard("bugsnag_close", (), || {
		let client = CLIENT.write().take();
		if let Some(client) = client {
			client.close();
		}
	})
}

/// Sets the delivery function; null restores the default logging delivery.
#[no_mangle]
pub extern "C" fn bugsnag_set_delivery(delivery: Option<DeliveryFn>) {
	guard("bugsnag_set_delivery", (), || {
		with_client(|client| match delivery {
			Some(func) => client.set_delivery(ExternDelivery::new(func)),
			None => client.set_delivery(TracingDelivery),
		});
	})
}

/// Reports a handled error with the given name, message and severity code.
///
/// # Safety
/// `name` and `message` must be null or NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_notify(name: *const c_char, message: *const c_char, severity: c_int) {
	guard("bugsnag_notify", (), || {
		let Some(name) = opt_str(name) else {
			debug!("notify without an error class, ignoring");
			return;
		};
		let message = opt_str(message);
		let severity = Severity::try_from(severity).unwrap_or_else(|e| {
			debug!(error = %e, "unknown severity, reporting as error");
			Severity::Error
		});

		with_client(|client| match client.notify(&name, message.as_deref(), severity) {
			Ok(outcome) => debug!(outcome = ?outcome, "notify finished"),
			Err(e) => warn!(error = %e, "notify rejected"),
		});
	})
}

/// # Safety
/// See [`bugsnag_notify`]. `env` is ignored.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_notify_env(
	_env: *mut c_void,
	name: *const c_char,
	message: *const c_char,
	severity: c_int,
) {
	bugsnag_notify(name, message, severity)
}

/// Sets the user on the template. Null or empty strings clear a field.
///
/// # Safety
/// Each argument must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_set_user(id: *const c_char, email: *const c_char, name: *const c_char) {
	let (id, email, name) = (opt_str(id), opt_str(email), opt_str(name));
	guard("bugsnag_set_user", (), || {
		with_client(|client| client.set_user(id.as_deref(), email.as_deref(), name.as_deref()));
	})
}

/// # Safety
/// See [`bugsnag_set_user`]. `env` is ignored.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_set_user_env(
	_env: *mut c_void,
	id: *const c_char,
	email: *const c_char,
	name: *const c_char,
) {
	bugsnag_set_user(id, email, name)
}

/// Appends a breadcrumb. Unknown type codes and empty messages are ignored.
///
/// # Safety
/// `message` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_leave_breadcrumb(message: *const c_char, breadcrumb_type: c_int) {
	guard("bugsnag_leave_breadcrumb", (), || {
		let Some(message) = opt_str(message) else {
			return;
		};
		let breadcrumb_type = match BreadcrumbType::try_from(breadcrumb_type) {
			Ok(t) => t,
			Err(e) => {
				debug!(error = %e, "ignoring breadcrumb");
				return;
			}
		};
		with_client(|client| client.leave_breadcrumb(&message, breadcrumb_type));
	})
}

/// # Safety
/// See [`bugsnag_leave_breadcrumb`]. `env` is ignored.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_leave_breadcrumb_env(
	_env: *mut c_void,
	message: *const c_char,
	breadcrumb_type: c_int,
) {
	bugsnag_leave_breadcrumb(message, breadcrumb_type)
}

/// Registers an on-error callback and returns its token, or 0 when nothing
/// was registered.
#[no_mangle]
pub extern "C" fn bugsnag_add_on_error(callback: Option<OnErrorFn>) -> u64 {
	guard("bugsnag_add_on_error", 0, || {
		let Some(callback) = callback else {
			return 0;
		};
		with_client(|client| {
			client
				.add_on_error(move |event: &mut EventRecord| callback(event))
				.as_raw()
		})
		.unwrap_or(0)
	})
}

#[no_mangle]
pub extern "C" fn bugsnag_add_on_error_env(_env: *mut c_void, callback: Option<OnErrorFn>) -> u64 {
	bugsnag_add_on_error(callback)
}

/// Unregisters the callback behind `token`. Unknown tokens are ignored.
#[no_mangle]
pub extern "C" fn bugsnag_remove_on_error(token: u64) {
	guard("bugsnag_remove_on_error", (), || {
		with_client(|client| client.remove_on_error(CallbackId::from_raw(token)));
	})
}

#[no_mangle]
pub extern "C" fn bugsnag_remove_on_error_env(_env: *mut c_void, token: u64) {
	bugsnag_remove_on_error(token)
}

/// # Safety
/// `context` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_set_context(context: *const c_char) {
	let context = opt_str(context);
	guard("bugsnag_set_context", (), || {
		with_client(|client| client.set_context(context.as_deref()));
	})
}

/// Adds a string value to a template metadata section. A null value clears
/// the key.
///
/// # Safety
/// Each argument must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_add_metadata_string(
	section: *const c_char,
	key: *const c_char,
	value: *const c_char,
) {
	let (Some(section), Some(key)) = (opt_str(section), opt_str(key)) else {
		return;
	};
	let value = opt_str(value);
	guard("bugsnag_add_metadata_string", (), || {
		with_client(|client| match value {
			Some(value) => client.add_metadata(&section, &key, value.into_owned()),
			None => client.clear_metadata(&section, Some(key.as_ref())),
		});
	})
}

/// Clears one key, or the whole section when `key` is null.
///
/// # Safety
/// Each argument must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_clear_metadata(section: *const c_char, key: *const c_char) {
	let Some(section) = opt_str(section) else {
		return;
	};
	let key = opt_str(key);
	guard("bugsnag_clear_metadata", (), || {
		with_client(|client| client.clear_metadata(&section, key.as_deref()));
	})
}

macro_rules! template_text_setters {
	($($name:ident => $setter:ident;)*) => {
		$(
			/// Sets the field on the template. Null or empty clears it.
			///
			/// # Safety
			/// `value` must be null or a NUL-terminated string.
			#[no_mangle]
			pub unsafe extern "C" fn $name(value: *const c_char) {
				let value = opt_str(value);
				guard(stringify!($name), (), || {
					with_client(|client| client.template().$setter(value.as_deref()));
				})
			}
		)*
	};
}

template_text_setters! {
	bugsnag_set_app_binary_arch => set_binary_arch;
	bugsnag_set_app_build_uuid => set_build_uuid;
	bugsnag_set_app_id => set_app_id;
	bugsnag_set_app_release_stage => set_release_stage;
	bugsnag_set_app_type => set_app_type;
	bugsnag_set_app_version => set_version;
}

#[no_mangle]
pub extern "C" fn bugsnag_set_app_version_code(value: c_int) {
	guard("bugsnag_set_app_version_code", (), || {
		with_client(|client| client.template().set_version_code(Some(value)));
	})
}

/// Seconds. Negative values clear the field.
#[no_mangle]
pub extern "C" fn bugsnag_set_app_duration(value: i64) {
	guard("bugsnag_set_app_duration", (), || {
		with_client(|client| client.template().set_duration(accessors::secs_duration(value)));
	})
}

/// Seconds. Negative values clear the field.
#[no_mangle]
pub extern "C" fn bugsnag_set_app_duration_in_foreground(value: i64) {
	guard("bugsnag_set_app_duration_in_foreground", (), || {
		with_client(|client| {
			client
				.template()
				.set_duration_in_foreground(accessors::secs_duration(value))
		});
	})
}

#[no_mangle]
pub extern "C" fn bugsnag_set_app_in_foreground(value: bool) {
	guard("bugsnag_set_app_in_foreground", (), || {
		with_client(|client| client.template().set_in_foreground(Some(value)));
	})
}

/// Starts ANR monitoring on `buffer`. A null or misaligned buffer does
/// nothing, as does enabling twice.
///
/// # Safety
/// A non-null `buffer` must point to at least eight bytes, aligned for a
/// `u64`, that stay valid until [`bugsnag_disable_anr_reporting`] or
/// [`bugsnag_close`] returns.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_enable_anr_reporting(buffer: *mut c_void) {
	let Some(buffer) = AnrBuffer::from_raw(buffer) else {
		debug!("no usable ANR buffer, reporting stays disabled");
		return;
	};
	guard("bugsnag_enable_anr_reporting", (), || {
		with_client(|client| {
			if let Err(e) = client.enable_anr_reporting(buffer) {
				warn!(error = %e, "failed to enable ANR reporting");
			}
		});
	})
}

/// Stops ANR monitoring. Does nothing when it is not enabled.
#[no_mangle]
pub extern "C" fn bugsnag_disable_anr_reporting() {
	guard("bugsnag_disable_anr_reporting", (), || {
		with_client(|client| client.disable_anr_reporting());
	})
}

/// Returns the installed client, if any.
pub fn client() -> Option<NativeClient> {
	CLIENT.read().clone()
}
