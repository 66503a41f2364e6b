// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-field accessors over an event handle.
//!
//! A handle is either the event passed to an on-error callback or delivery
//! function (valid for that call only), or one made by [`bugsnag_event_new`].
//! Strings returned by getters point into the event and stay valid until the
//! same field is written again or the event is freed. Null handles are
//! ignored; getters on a null handle return the unset value.

use std::ffi::{c_char, c_double, c_int};
use std::ptr;
use std::time::Duration;

use loom_crash_core::{AppInfo, EventRecord, Severity, Text};
use tracing::debug;

use super::{client, opt_str};

unsafe fn event_ref<'a>(event: *const EventRecord) -> Option<&'a EventRecord> {
	event.as_ref()
}

unsafe fn event_mut<'a>(event: *mut EventRecord) -> Option<&'a mut EventRecord> {
	event.as_mut()
}

fn text_ptr(text: Option<&Text>) -> *const c_char {
	text.map_or(ptr::null(), Text::as_ptr)
}

unsafe fn get_app_text(event: *const EventRecord, field: impl FnOnce(&AppInfo) -> Option<&Text>) -> *const c_char {
	event_ref(event).map_or(ptr::null(), |event| text_ptr(field(&event.app)))
}

unsafe fn set_app_text(event: *mut EventRecord, value: *const c_char, set: impl FnOnce(&mut AppInfo, Option<&str>)) {
	if let Some(event) = event_mut(event) {
		let value = opt_str(value);
		set(&mut event.app, value.as_deref());
	}
}

/// Creates an event from the current template, or an empty event when no
/// client is installed. Free it with [`bugsnag_event_free`].
#[no_mangle]
pub extern "C" fn bugsnag_event_new() -> *mut EventRecord {
	let event = client().map_or_else(EventRecord::new, |client| client.template().snapshot());
	Box::into_raw(Box::new(event))
}

/// # Safety
/// `event` must be null or a handle from [`bugsnag_event_new`] that has not
/// been freed.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_event_free(event: *mut EventRecord) {
	if !event.is_null() {
		drop(Box::from_raw(event));
	}
}

/// # Safety
/// `event` must be null or a live event handle.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_event_get_context(event: *const EventRecord) -> *const c_char {
	event_ref(event).map_or(ptr::null(), |event| text_ptr(event.context.as_ref()))
}

/// # Safety
/// `event` must be null or a live event handle; `value` must be null or a
/// NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_event_set_context(event: *mut EventRecord, value: *const c_char) {
	if let Some(event) = event_mut(event) {
		event.set_context(opt_str(value).as_deref());
	}
}

/// # Safety
/// `event` must be null or a live event handle.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_event_get_error_class(event: *const EventRecord) -> *const c_char {
	event_ref(event).map_or(ptr::null(), |event| {
		text_ptr(event.error.as_ref().map(|error| &error.error_class))
	})
}

/// # Safety
/// `event` must be null or a live event handle.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_event_get_error_message(event: *const EventRecord) -> *const c_char {
	event_ref(event).map_or(ptr::null(), |event| {
		text_ptr(event.error.as_ref().and_then(|error| error.message.as_ref()))
	})
}

/// # Safety
/// `event` must be null or a live event handle.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_event_get_unhandled(event: *const EventRecord) -> bool {
	event_ref(event).is_some_and(|event| event.unhandled)
}

/// # Safety
/// `event` must be null or a live event handle.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_event_get_severity(event: *const EventRecord) -> c_int {
	event_ref(event).map_or(Severity::default(), |event| event.severity).code()
}

/// Unknown severity codes are ignored.
///
/// # Safety
/// `event` must be null or a live event handle.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_event_set_severity(event: *mut EventRecord, severity: c_int) {
	let Some(event) = event_mut(event) else {
		return;
	};
	match Severity::try_from(severity) {
		Ok(severity) => event.severity = severity,
		Err(e) => debug!(error = %e, "ignoring severity"),
	}
}

/// # Safety
/// `event` must be null or a live event handle.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_event_get_user_id(event: *const EventRecord) -> *const c_char {
	event_ref(event).map_or(ptr::null(), |event| text_ptr(event.user.id.as_ref()))
}

/// # Safety
/// `event` must be null or a live event handle.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_event_get_user_email(event: *const EventRecord) -> *const c_char {
	event_ref(event).map_or(ptr::null(), |event| text_ptr(event.user.email.as_ref()))
}

/// # Safety
/// `event` must be null or a live event handle.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_event_get_user_name(event: *const EventRecord) -> *const c_char {
	event_ref(event).map_or(ptr::null(), |event| text_ptr(event.user.name.as_ref()))
}

/// # Safety
/// `event` must be null or a live event handle; the strings must be null or
/// NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_event_set_user(
	event: *mut EventRecord,
	id: *const c_char,
	email: *const c_char,
	name: *const c_char,
) {
	if let Some(event) = event_mut(event) {
		event.set_user(opt_str(id).as_deref(), opt_str(email).as_deref(), opt_str(name).as_deref());
	}
}

unsafe fn add_event_metadata(
	event: *mut EventRecord,
	section: *const c_char,
	key: *const c_char,
	value: serde_json::Value,
) {
	let Some(event) = event_mut(event) else {
		return;
	};
	if let (Some(section), Some(key)) = (opt_str(section), opt_str(key)) {
		event.metadata.add(&section, &key, value);
	}
}

/// A null value clears the key.
///
/// # Safety
/// `event` must be null or a live event handle; the strings must be null or
/// NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_event_add_metadata_string(
	event: *mut EventRecord,
	section: *const c_char,
	key: *const c_char,
	value: *const c_char,
) {
	let value = opt_str(value).map_or(serde_json::Value::Null, |v| v.into_owned().into());
	add_event_metadata(event, section, key, value);
}

/// # Safety
/// See [`bugsnag_event_add_metadata_string`].
#[no_mangle]
pub unsafe extern "C" fn bugsnag_event_add_metadata_bool(
	event: *mut EventRecord,
	section: *const c_char,
	key: *const c_char,
	value: bool,
) {
	add_event_metadata(event, section, key, value.into());
}

/// Non-finite values clear the key.
///
/// # Safety
/// See [`bugsnag_event_add_metadata_string`].
#[no_mangle]
pub unsafe extern "C" fn bugsnag_event_add_metadata_double(
	event: *mut EventRecord,
	section: *const c_char,
	key: *const c_char,
	value: c_double,
) {
	add_event_metadata(event, section, key, value.into());
}

/// Clears one key, or the whole section when `key` is null.
///
/// # Safety
/// See [`bugsnag_event_add_metadata_string`].
#[no_mangle]
pub unsafe extern "C" fn bugsnag_event_clear_metadata(
	event: *mut EventRecord,
	section: *const c_char,
	key: *const c_char,
) {
	let Some(event) = event_mut(event) else {
		return;
	};
	let Some(section) = opt_str(section) else {
		return;
	};
	match opt_str(key) {
		Some(key) => event.metadata.clear_key(&section, &key),
		None => event.metadata.clear_section(&section),
	}
}

macro_rules! app_text_accessors {
	($($getter:ident, $setter:ident, $field:ident, $set:ident;)*) => {
		$(
			/// # Safety
			/// `event` must be null or a live event handle.
			#[no_mangle]
			pub unsafe extern "C" fn $getter(event: *const EventRecord) -> *const c_char {
				get_app_text(event, |app| app.$field.as_ref())
			}

			/// # Safety
			/// `event` must be null or a live event handle; `value` must be
			/// null or a NUL-terminated string.
			#[no_mangle]
			pub unsafe extern "C" fn $setter(event: *mut EventRecord, value: *const c_char) {
				set_app_text(event, value, AppInfo::$set)
			}
		)*
	};
}

app_text_accessors! {
	bugsnag_app_get_binary_arch, bugsnag_app_set_binary_arch, binary_arch, set_binary_arch;
	bugsnag_app_get_build_uuid, bugsnag_app_set_build_uuid, build_uuid, set_build_uuid;
	bugsnag_app_get_id, bugsnag_app_set_id, id, set_id;
	bugsnag_app_get_release_stage, bugsnag_app_set_release_stage, release_stage, set_release_stage;
	bugsnag_app_get_type, bugsnag_app_set_type, app_type, set_app_type;
	bugsnag_app_get_version, bugsnag_app_set_version, version, set_version;
}

/// Returns -1 when unset.
///
/// # Safety
/// `event` must be null or a live event handle.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_app_get_version_code(event: *const EventRecord) -> c_int {
	event_ref(event).and_then(|event| event.app.version_code).unwrap_or(-1)
}

/// # Safety
/// `event` must be null or a live event handle.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_app_set_version_code(event: *mut EventRecord, value: c_int) {
	if let Some(event) = event_mut(event) {
		event.app.version_code = Some(value);
	}
}

fn duration_secs(value: Option<Duration>) -> i64 {
	value.map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}

/// Negative values clear the field.
pub(super) fn secs_duration(value: i64) -> Option<Duration> {
	u64::try_from(value).ok().map(Duration::from_secs)
}

/// Seconds; 0 when unset.
///
/// # Safety
/// `event` must be null or a live event handle.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_app_get_duration(event: *const EventRecord) -> i64 {
	duration_secs(event_ref(event).and_then(|event| event.app.duration))
}

/// # Safety
/// `event` must be null or a live event handle.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_app_set_duration(event: *mut EventRecord, value: i64) {
	if let Some(event) = event_mut(event) {
		event.app.duration = secs_duration(value);
	}
}

/// Seconds; 0 when unset.
///
/// # Safety
/// `event` must be null or a live event handle.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_app_get_duration_in_foreground(event: *const EventRecord) -> i64 {
	duration_secs(event_ref(event).and_then(|event| event.app.duration_in_foreground))
}

/// # Safety
/// `event` must be null or a live event handle.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_app_set_duration_in_foreground(event: *mut EventRecord, value: i64) {
	if let Some(event) = event_mut(event) {
		event.app.duration_in_foreground = secs_duration(value);
	}
}

/// `false` when unknown.
///
/// # Safety
/// `event` must be null or a live event handle.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_app_get_in_foreground(event: *const EventRecord) -> bool {
	event_ref(event).is_some_and(|event| event.app.is_in_foreground())
}

/// # Safety
/// `event` must be null or a live event handle.
#[no_mangle]
pub unsafe extern "C" fn bugsnag_app_set_in_foreground(event: *mut EventRecord, value: bool) {
	if let Some(event) = event_mut(event) {
		event.app.in_foreground = Some(value);
	}
}
