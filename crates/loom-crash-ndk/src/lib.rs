// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Native crash and ANR reporting agent for Loom.
//!
//! Native code populates a process-wide event template through the C
//! surface in [`ffi`]. Handled errors (`bugsnag_notify`) and detected ANRs
//! are cloned from that template, run through the on-error callbacks and
//! handed to a [`Delivery`].
//!
//! # Example
//!
//! ```
//! use loom_crash_core::{BreadcrumbType, EventRecord, Severity};
//! use loom_crash_ndk::{DeliveryStatus, NativeClient, ReportOutcome};
//!
//! let client = NativeClient::builder()
//!     .delivery(|event: EventRecord| {
//!         assert_eq!(event.error_class(), Some("OOM"));
//!         DeliveryStatus::Delivered
//!     })
//!     .build()?;
//!
//! client.template().set_version_code(Some(42));
//! client.leave_breadcrumb("opened camera", BreadcrumbType::Navigation);
//! let outcome = client.notify("OOM", Some("low memory"), Severity::Warning)?;
//! assert_eq!(outcome, ReportOutcome::Delivered);
//! # Ok::<(), loom_crash_ndk::NativeError>(())
//! ```

pub mod anr;
pub mod breadcrumbs;
pub mod callbacks;
pub mod client;
pub mod config;
pub mod delivery;
pub mod error;
pub mod ffi;
pub mod logging;
pub mod template;

pub use anr::{AnrBuffer, HandlerController};
pub use breadcrumbs::BreadcrumbLog;
pub use callbacks::{Callback, CallbackChain, CallbackId};
pub use client::{NativeClient, NativeClientBuilder, ReportOutcome, RuntimeContext, ANR_ERROR_CLASS, ANR_MESSAGE};
pub use config::{load_config, load_config_with_file, NativeConfig};
pub use delivery::{Delivery, DeliveryFn, DeliveryStatus, ExternDelivery, TracingDelivery};
pub use error::{NativeError, Result};
pub use template::EventTemplate;
