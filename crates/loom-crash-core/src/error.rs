// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the crash event model.

use thiserror::Error;

/// Errors that can occur while building or parsing event data.
#[derive(Debug, Error)]
pub enum CrashError {
	#[error("invalid severity: {0}")]
	InvalidSeverity(String),

	#[error("unknown severity code: {0}")]
	UnknownSeverityCode(i32),

	#[error("invalid breadcrumb type: {0}")]
	InvalidBreadcrumbType(String),

	#[error("unknown breadcrumb type code: {0}")]
	UnknownBreadcrumbTypeCode(i32),

	#[error("breadcrumb message must not be empty")]
	EmptyBreadcrumbMessage,

	#[error("error class must not be empty")]
	EmptyErrorClass,

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

/// Result type for crash event operations.
pub type Result<T> = std::result::Result<T, CrashError>;
