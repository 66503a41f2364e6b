// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The native agent client: owns the event template, the callback chains, the
//! delivery collaborator and the ANR controller.

use std::ffi::c_void;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use loom_crash_core::{Breadcrumb, BreadcrumbType, EventRecord, Severity};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::anr::{AnrBuffer, HandlerController};
use crate::callbacks::{Callback, CallbackChain, CallbackId};
use crate::config::{validate_config, NativeConfig};
use crate::delivery::{Delivery, DeliveryStatus, TracingDelivery};
use crate::error::{NativeError, Result};
use crate::template::EventTemplate;

/// Error class attached to ANR reports.
pub const ANR_ERROR_CLASS: &str = "ANR";
/// Message attached to ANR reports.
pub const ANR_MESSAGE: &str = "Application did not respond to UI input";

/// Opaque handle to the host runtime, kept for the `_env` entry points.
///
/// Never dereferenced by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeContext(*mut c_void);

// SAFETY: the pointer is stored and handed back, never dereferenced.
unsafe impl Send for RuntimeContext {}
// SAFETY: see above.
unsafe impl Sync for RuntimeContext {}

impl RuntimeContext {
	pub fn from_raw(ptr: *mut c_void) -> Self {
		Self(ptr)
	}

	pub fn as_raw(self) -> *mut c_void {
		self.0
	}
}

impl Default for RuntimeContext {
	fn default() -> Self {
		Self(std::ptr::null_mut())
	}
}

/// What happened to a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportOutcome {
	Delivered,
	Undelivered,
	Failed,
	/// An on-error callback returned `false`.
	Vetoed,
	/// The error class is in `discard_classes`.
	Discarded,
	/// The release stage is not in `enabled_release_stages`.
	Filtered,
	/// The client was closed.
	Closed,
}

impl From<DeliveryStatus> for ReportOutcome {
	fn from(status: DeliveryStatus) -> Self {
		match status {
			DeliveryStatus::Delivered => ReportOutcome::Delivered,
			DeliveryStatus::Undelivered => ReportOutcome::Undelivered,
			DeliveryStatus::Failure => ReportOutcome::Failed,
		}
	}
}

/// Builder for [`NativeClient`].
pub struct NativeClientBuilder {
	config: NativeConfig,
	delivery: Option<Arc<dyn Delivery>>,
	runtime_context: RuntimeContext,
}

impl NativeClientBuilder {
	pub fn new() -> Self {
		Self {
			config: NativeConfig::default(),
			delivery: None,
			runtime_context: RuntimeContext::default(),
		}
	}

	pub fn config(mut self, config: NativeConfig) -> Self {
		self.config = config;
		self
	}

	pub fn delivery(mut self, delivery: impl Delivery + 'static) -> Self {
		self.delivery = Some(Arc::new(delivery));
		self
	}

	pub fn runtime_context(mut self, context: RuntimeContext) -> Self {
		self.runtime_context = context;
		self
	}

	pub fn build(self) -> Result<NativeClient> {
		validate_config(&self.config)?;

		let delivery = self.delivery.unwrap_or_else(|| Arc::new(TracingDelivery));
		let inner = Arc::new(NativeClientInner {
			template: EventTemplate::new(self.config.breadcrumbs.max_breadcrumbs),
			on_error: CallbackChain::new(),
			delivery: RwLock::new(delivery),
			anr: HandlerController::new(),
			runtime_context: self.runtime_context,
			closed: AtomicBool::new(false),
			config: self.config,
		});

		info!(
			max_breadcrumbs = inner.config.breadcrumbs.max_breadcrumbs,
			"Native client initialized"
		);

		Ok(NativeClient { inner })
	}
}

impl Default for NativeClientBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Internal client state, shared with the ANR monitor through a `Weak`.
struct NativeClientInner {
	config: NativeConfig,
	template: EventTemplate,
	on_error: CallbackChain<EventRecord>,
	delivery: RwLock<Arc<dyn Delivery>>,
	anr: HandlerController,
	runtime_context: RuntimeContext,
	closed: AtomicBool,
}

impl NativeClientInner {
	fn report(&self, mut event: EventRecord) -> ReportOutcome {
		if self.closed.load(Ordering::SeqCst) {
			debug!("client closed, dropping report");
			return ReportOutcome::Closed;
		}

		if self.config.release.should_discard(event.error_class()) {
			debug!(
				error_class = event.error_class().unwrap_or_default(),
				"error class discarded, dropping report"
			);
			return ReportOutcome::Discarded;
		}

		if !self.config.release.should_notify(event.app.release_stage.as_deref()) {
			debug!(
				release_stage = event.app.release_stage.as_deref().unwrap_or_default(),
				"release stage not enabled, dropping report"
			);
			return ReportOutcome::Filtered;
		}

		if !self.on_error.run(&mut event) {
			debug!(error_class = event.error_class().unwrap_or_default(), "report vetoed by on-error callback");
			return ReportOutcome::Vetoed;
		}

		let crumb = error_breadcrumb(&event);
		let delivery = Arc::clone(&*self.delivery.read());
		let status = delivery.deliver(event);
		match status {
			DeliveryStatus::Delivered | DeliveryStatus::Undelivered => {
				if let Some(crumb) = crumb {
					self.template.breadcrumbs().append(crumb);
				}
			}
			DeliveryStatus::Failure => {
				warn!("event delivery failed");
			}
		}

		debug!(status = %status, "report finished");
		status.into()
	}

	fn report_anr(&self) -> ReportOutcome {
		let mut event = self.template.snapshot();
		event.severity = Severity::Error;
		event.unhandled = true;
		if let Err(e) = event.set_error(ANR_ERROR_CLASS, Some(ANR_MESSAGE)) {
			warn!(error = %e, "failed to build ANR event");
			return ReportOutcome::Failed;
		}
		self.report(event)
	}
}

fn error_breadcrumb(event: &EventRecord) -> Option<Breadcrumb> {
	let error_class = event.error_class()?;
	let crumb = Breadcrumb::new(error_class, BreadcrumbType::Error).ok()?;
	Some(match event.error_message() {
		Some(message) => crumb.with_metadata("message", message),
		None => crumb,
	})
}

/// Handle to the native agent. Cheap to clone.
#[derive(Clone)]
pub struct NativeClient {
	inner: Arc<NativeClientInner>,
}

impl NativeClient {
	pub fn builder() -> NativeClientBuilder {
		NativeClientBuilder::new()
	}

	pub fn config(&self) -> &NativeConfig {
		&self.inner.config
	}

	/// The process-wide template every report is cloned from.
	pub fn template(&self) -> &EventTemplate {
		&self.inner.template
	}

	pub fn runtime_context(&self) -> RuntimeContext {
		self.inner.runtime_context
	}

	/// Replaces the delivery collaborator for subsequent reports.
	pub fn set_delivery(&self, delivery: impl Delivery + 'static) {
		*self.inner.delivery.write() = Arc::new(delivery);
		debug!("delivery replaced");
	}

	/// Reports a handled error.
	///
	/// Fails only when `name` is empty; every other outcome is reported through
	/// [`ReportOutcome`].
	pub fn notify(&self, name: &str, message: Option<&str>, severity: Severity) -> Result<ReportOutcome> {
		if self.is_closed() {
			return Ok(ReportOutcome::Closed);
		}

		let mut event = self.inner.template.snapshot();
		event.set_error(name, message)?;
		event.severity = severity;
		event.unhandled = false;
		Ok(self.inner.report(event))
	}

	/// Runs a prepared event through the release-stage filter, the on-error
	/// chain and delivery.
	pub fn report(&self, event: EventRecord) -> ReportOutcome {
		self.inner.report(event)
	}

	/// Builds and reports an ANR event from the current template.
	pub fn report_anr(&self) -> ReportOutcome {
		self.inner.report_anr()
	}

	pub fn leave_breadcrumb(&self, message: &str, breadcrumb_type: BreadcrumbType) -> bool {
		self.inner.template.breadcrumbs().leave(message, breadcrumb_type)
	}

	pub fn set_user(&self, id: Option<&str>, email: Option<&str>, name: Option<&str>) {
		self.inner.template.set_user(id, email, name);
	}

	pub fn set_context(&self, context: Option<&str>) {
		self.inner.template.set_context(context);
	}

	pub fn add_metadata(&self, section: &str, key: &str, value: impl Into<serde_json::Value>) {
		self.inner.template.add_metadata(section, key, value);
	}

	/// Clears one key, or the whole section when `key` is `None`.
	pub fn clear_metadata(&self, section: &str, key: Option<&str>) {
		match key {
			Some(key) => self.inner.template.clear_metadata(section, key),
			None => self.inner.template.clear_metadata_section(section),
		}
	}

	pub fn add_on_error(&self, callback: impl Callback<EventRecord> + 'static) -> CallbackId {
		self.inner.on_error.add(callback)
	}

	pub fn remove_on_error(&self, id: CallbackId) -> bool {
		self.inner.on_error.remove(id)
	}

	pub fn add_on_breadcrumb(&self, callback: impl Callback<Breadcrumb> + 'static) -> CallbackId {
		self.inner.template.breadcrumbs().callbacks().add(callback)
	}

	pub fn remove_on_breadcrumb(&self, id: CallbackId) -> bool {
		self.inner.template.breadcrumbs().callbacks().remove(id)
	}

	/// Starts ANR monitoring on `buffer`. Returns `Ok(false)` if already enabled.
	pub fn enable_anr_reporting(&self, buffer: AnrBuffer) -> Result<bool> {
		if self.is_closed() {
			return Err(NativeError::ClientClosed);
		}

		let weak: Weak<NativeClientInner> = Arc::downgrade(&self.inner);
		let installed = self.inner.anr.enable(buffer, &self.inner.config.anr, move || {
			if let Some(inner) = weak.upgrade() {
				let outcome = inner.report_anr();
				debug!(outcome = ?outcome, "ANR report finished");
			}
		})?;

		// A close() that raced the install may have disabled an empty controller.
		if installed && self.is_closed() {
			self.inner.anr.disable();
			return Err(NativeError::ClientClosed);
		}
		Ok(installed)
	}

	pub fn disable_anr_reporting(&self) -> bool {
		self.inner.anr.disable()
	}

	pub fn is_anr_reporting_enabled(&self) -> bool {
		self.inner.anr.is_installed()
	}

	/// Stops ANR monitoring and refuses further reports. Safe to call twice.
	pub fn close(&self) {
		if self.inner.closed.swap(true, Ordering::SeqCst) {
			return;
		}
		self.inner.anr.disable();
		info!("Native client closed");
	}

	pub fn is_closed(&self) -> bool {
		self.inner.closed.load(Ordering::SeqCst)
	}
}

impl fmt::Debug for NativeClient {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("NativeClient")
			.field("closed", &self.is_closed())
			.field("anr", &self.inner.anr)
			.finish_non_exhaustive()
	}
}
