// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Drives the agent through its C entry points, the way native host code does.

use std::ffi::{c_char, c_int, CStr, CString};
use std::ptr;

use loom_crash_core::{BreadcrumbType, EventRecord, Severity};
use loom_crash_ndk::ffi::*;
use loom_crash_ndk::DeliveryStatus;
use parking_lot::{Mutex, MutexGuard};

static SERIAL: Mutex<()> = parking_lot::const_mutex(());
static DELIVERED: Mutex<Vec<Delivered>> = parking_lot::const_mutex(Vec::new());
static CALLS: Mutex<Vec<&'static str>> = parking_lot::const_mutex(Vec::new());

#[derive(Debug, Clone)]
struct Delivered {
	error_class: Option<String>,
	message: Option<String>,
	severity: c_int,
	version_code: c_int,
	version: Option<String>,
	release_stage: Option<String>,
	duration: i64,
	in_foreground: bool,
	unhandled: bool,
	context: Option<String>,
	breadcrumbs: Vec<(String, BreadcrumbType)>,
}

unsafe fn read(ptr: *const c_char) -> Option<String> {
	if ptr.is_null() {
		None
	} else {
		Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
	}
}

extern "C" fn capture(event: *mut EventRecord) -> c_int {
	let delivered = unsafe {
		Delivered {
			error_class: read(bugsnag_event_get_error_class(event)),
			message: read(bugsnag_event_get_error_message(event)),
			severity: bugsnag_event_get_severity(event),
			version_code: bugsnag_app_get_version_code(event),
			version: read(bugsnag_app_get_version(event)),
			release_stage: read(bugsnag_app_get_release_stage(event)),
			duration: bugsnag_app_get_duration(event),
			in_foreground: bugsnag_app_get_in_foreground(event),
			unhandled: bugsnag_event_get_unhandled(event),
			context: read(bugsnag_event_get_context(event)),
			breadcrumbs: (*event)
				.breadcrumbs
				.iter()
				.map(|crumb| (crumb.message.to_string(), crumb.breadcrumb_type))
				.collect(),
		}
	};
	DELIVERED.lock().push(delivered);
	DeliveryStatus::Delivered.code()
}

extern "C" fn record_a(_: *mut EventRecord) -> bool {
	CALLS.lock().push("A");
	true
}

extern "C" fn record_b(_: *mut EventRecord) -> bool {
	CALLS.lock().push("B");
	true
}

extern "C" fn record_c(_: *mut EventRecord) -> bool {
	CALLS.lock().push("C");
	true
}

extern "C" fn veto(_: *mut EventRecord) -> bool {
	CALLS.lock().push("veto");
	false
}

extern "C" fn rename_context(event: *mut EventRecord) -> bool {
	let context = CString::new("rewritten").unwrap();
	unsafe { bugsnag_event_set_context(event, context.as_ptr()) };
	true
}

/// Serializes tests and starts each one with a fresh client.
fn fresh_client() -> MutexGuard<'static, ()> {
	let guard = SERIAL.lock();
	bugsnag_close();
	unsafe { bugsnag_init(ptr::null_mut()) };
	bugsnag_set_delivery(Some(capture));
	DELIVERED.lock().clear();
	CALLS.lock().clear();
	guard
}

fn notify(name: &str, message: &str, severity: Severity) {
	let name = CString::new(name).unwrap();
	let message = CString::new(message).unwrap();
	unsafe { bugsnag_notify(name.as_ptr(), message.as_ptr(), severity.code()) };
}

#[test]
fn test_calls_before_init_are_ignored() {
	let _guard = SERIAL.lock();
	bugsnag_close();
	DELIVERED.lock().clear();

	notify("Boom", "nothing installed", Severity::Error);
	assert_eq!(bugsnag_add_on_error(Some(record_a)), 0);
	bugsnag_remove_on_error(12);
	bugsnag_disable_anr_reporting();
	assert!(loom_crash_ndk::ffi::client().is_none());
	assert!(DELIVERED.lock().is_empty());
}

#[test]
fn test_notify_snapshot_scenario() {
	let _guard = fresh_client();
	bugsnag_set_app_version_code(42);

	notify("OOM", "low memory", Severity::Warning);
	bugsnag_set_app_version_code(43);

	let delivered = DELIVERED.lock();
	assert_eq!(delivered.len(), 1);
	assert_eq!(delivered[0].error_class.as_deref(), Some("OOM"));
	assert_eq!(delivered[0].message.as_deref(), Some("low memory"));
	assert_eq!(delivered[0].severity, Severity::Warning.code());
	assert_eq!(delivered[0].version_code, 42);
	assert!(!delivered[0].unhandled);
}

#[test]
fn test_template_app_fields_reach_later_reports() {
	let _guard = fresh_client();
	let version = CString::new("2.4.1").unwrap();
	let stage = CString::new("beta").unwrap();
	unsafe {
		bugsnag_set_app_version(version.as_ptr());
		bugsnag_set_app_release_stage(stage.as_ptr());
	}
	bugsnag_set_app_duration(90);
	bugsnag_set_app_in_foreground(true);

	notify("Boom", "first", Severity::Error);

	unsafe { bugsnag_set_app_version(ptr::null()) };
	bugsnag_set_app_duration(-1);
	bugsnag_set_app_in_foreground(false);
	notify("Boom", "second", Severity::Error);

	let delivered = DELIVERED.lock();
	assert_eq!(delivered[0].version.as_deref(), Some("2.4.1"));
	assert_eq!(delivered[0].release_stage.as_deref(), Some("beta"));
	assert_eq!(delivered[0].duration, 90);
	assert!(delivered[0].in_foreground);

	assert!(delivered[1].version.is_none());
	assert_eq!(delivered[1].release_stage.as_deref(), Some("beta"));
	assert_eq!(delivered[1].duration, 0);
	assert!(!delivered[1].in_foreground);
}

#[test]
fn test_on_error_order_and_removal() {
	let _guard = fresh_client();
	let a = bugsnag_add_on_error(Some(record_a));
	let b = bugsnag_add_on_error_env(ptr::null_mut(), Some(record_b));
	let c = bugsnag_add_on_error(Some(record_c));
	assert!(a != 0 && b != 0 && c != 0);

	notify("Boom", "first", Severity::Error);
	assert_eq!(*CALLS.lock(), vec!["A", "B", "C"]);

	bugsnag_remove_on_error(b);
	bugsnag_remove_on_error(b);
	bugsnag_remove_on_error_env(ptr::null_mut(), 9_999);
	CALLS.lock().clear();

	notify("Boom", "second", Severity::Error);
	assert_eq!(*CALLS.lock(), vec!["A", "C"]);
	assert_eq!(DELIVERED.lock().len(), 2);
}

#[test]
fn test_veto_skips_delivery() {
	let _guard = fresh_client();
	bugsnag_add_on_error(Some(record_a));
	let v = bugsnag_add_on_error(Some(veto));
	bugsnag_add_on_error(Some(record_c));

	notify("Boom", "vetoed", Severity::Error);
	assert_eq!(*CALLS.lock(), vec!["A", "veto"]);
	assert!(DELIVERED.lock().is_empty());

	bugsnag_remove_on_error(v);
	notify("Boom", "allowed", Severity::Error);
	assert_eq!(DELIVERED.lock().len(), 1);
}

#[test]
fn test_callback_mutations_reach_delivery() {
	let _guard = fresh_client();
	let context = CString::new("MainActivity").unwrap();
	unsafe { bugsnag_set_context(context.as_ptr()) };
	bugsnag_add_on_error(Some(rename_context));

	notify("Boom", "context", Severity::Info);

	let delivered = DELIVERED.lock();
	assert_eq!(delivered[0].context.as_deref(), Some("rewritten"));
	let template_context = loom_crash_ndk::ffi::client().unwrap().template().context();
	assert_eq!(template_context.as_deref(), Some("MainActivity"));
}

#[test]
fn test_breadcrumbs_and_error_breadcrumb() {
	let _guard = fresh_client();
	let message = CString::new("opened settings").unwrap();
	let empty = CString::new("").unwrap();
	unsafe {
		bugsnag_leave_breadcrumb(message.as_ptr(), BreadcrumbType::Navigation.code());
		bugsnag_leave_breadcrumb_env(ptr::null_mut(), empty.as_ptr(), BreadcrumbType::Log.code());
		bugsnag_leave_breadcrumb(message.as_ptr(), 42);
	}

	notify("IOException", "disk full", Severity::Error);
	notify("IOException", "disk still full", Severity::Error);

	let delivered = DELIVERED.lock();
	assert_eq!(
		delivered[0].breadcrumbs,
		vec![("opened settings".to_string(), BreadcrumbType::Navigation)]
	);
	assert_eq!(delivered[1].breadcrumbs.len(), 2);
	assert_eq!(
		delivered[1].breadcrumbs[1],
		("IOException".to_string(), BreadcrumbType::Error)
	);
}

#[test]
fn test_user_and_metadata_reach_template() {
	let _guard = fresh_client();
	let id = CString::new("u-1").unwrap();
	let email = CString::new("ada@example.com").unwrap();
	let section = CString::new("account").unwrap();
	let key = CString::new("tier").unwrap();
	let value = CString::new("pro").unwrap();
	unsafe {
		bugsnag_set_user_env(ptr::null_mut(), id.as_ptr(), email.as_ptr(), ptr::null());
		bugsnag_add_metadata_string(section.as_ptr(), key.as_ptr(), value.as_ptr());
	}

	let event = bugsnag_event_new();
	unsafe {
		assert_eq!(read(bugsnag_event_get_user_id(event)).as_deref(), Some("u-1"));
		assert_eq!(read(bugsnag_event_get_user_email(event)).as_deref(), Some("ada@example.com"));
		assert!(bugsnag_event_get_user_name(event).is_null());
		assert_eq!((*event).metadata.get("account", "tier"), Some(&serde_json::json!("pro")));
		bugsnag_event_free(event);

		bugsnag_clear_metadata(section.as_ptr(), ptr::null());
	}

	let client = loom_crash_ndk::ffi::client().unwrap();
	assert!(client.template().metadata_value("account", "tier").is_none());
}

#[test]
fn test_close_stops_reporting() {
	let _guard = fresh_client();
	let client = loom_crash_ndk::ffi::client().unwrap();
	bugsnag_close();
	bugsnag_close();

	notify("Boom", "after close", Severity::Error);
	assert!(client.is_closed());
	assert!(DELIVERED.lock().is_empty());
}
