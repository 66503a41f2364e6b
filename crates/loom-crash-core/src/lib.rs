// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Loom native crash and ANR reporting agent.
//!
//! This crate holds the event data model shared by the native agent
//! (`loom-crash-ndk`) and anything that consumes finished reports:
//! - [`EventRecord`]: one error, crash, or ANR occurrence
//! - [`AppInfo`], [`UserInfo`], [`ErrorInfo`]: nested report state
//! - [`Breadcrumb`]: timestamped markers attached to a report
//! - [`Metadata`]: free-form diagnostic sections
//! - [`Text`]: the non-empty, C-readable string used by every string field

pub mod breadcrumb;
pub mod context;
pub mod error;
pub mod event;
pub mod metadata;
pub mod text;

pub use breadcrumb::{Breadcrumb, BreadcrumbType};
pub use context::{AppInfo, ErrorInfo, UserInfo};
pub use error::{CrashError, Result};
pub use event::{EventRecord, Severity};
pub use metadata::Metadata;
pub use text::Text;
