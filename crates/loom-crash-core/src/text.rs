// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Non-empty, NUL-terminated string storage for event fields.
//!
//! Every string field of an event is either absent or holds a [`Text`]. A
//! `Text` is never empty and carries its own terminator, so the same storage
//! can be read as `&str` from Rust and handed out as `*const c_char` to
//! native callers without a second allocation.

use std::ffi::{c_char, CStr};
use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Text {
	/// Always ends with a single `\0` and contains no other NUL byte.
	inner: Box<str>,
}

impl Text {
	/// Copies `value` into a new `Text`.
	///
	/// Returns `None` for an empty string. A value containing an interior NUL
	/// is truncated at the first NUL, which is what a C reader would see.
	pub fn new(value: &str) -> Option<Self> {
		let value = match value.find('\0') {
			Some(idx) => &value[..idx],
			None => value,
		};
		if value.is_empty() {
			return None;
		}

		let mut inner = String::with_capacity(value.len() + 1);
		inner.push_str(value);
		inner.push('\0');
		Some(Self {
			inner: inner.into_boxed_str(),
		})
	}

	/// Copies an optional string; `None` and `""` both produce `None`.
	pub fn from_opt(value: Option<&str>) -> Option<Self> {
		value.and_then(Self::new)
	}

	/// Copies a C string, replacing invalid UTF-8 sequences.
	pub fn from_c_str(value: &CStr) -> Option<Self> {
		Self::new(&value.to_string_lossy())
	}

	pub fn as_str(&self) -> &str {
		&self.inner[..self.inner.len() - 1]
	}

	pub fn as_c_str(&self) -> &CStr {
		// SAFETY: construction guarantees exactly one NUL, at the end.
		unsafe { CStr::from_bytes_with_nul_unchecked(self.inner.as_bytes()) }
	}

	/// Pointer to the NUL-terminated bytes, valid for as long as `self` lives.
	pub fn as_ptr(&self) -> *const c_char {
		self.inner.as_ptr().cast()
	}
}

impl Deref for Text {
	type Target = str;

	fn deref(&self) -> &str {
		self.as_str()
	}
}

impl AsRef<str> for Text {
	fn as_ref(&self) -> &str {
		self.as_str()
	}
}

impl PartialEq<str> for Text {
	fn eq(&self, other: &str) -> bool {
		self.as_str() == other
	}
}

impl PartialEq<&str> for Text {
	fn eq(&self, other: &&str) -> bool {
		self.as_str() == *other
	}
}

impl fmt::Display for Text {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl fmt::Debug for Text {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(self.as_str(), f)
	}
}

impl Serialize for Text {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(self.as_str())
	}
}

impl<'de> Deserialize<'de> for Text {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let value = String::deserialize(deserializer)?;
		Self::new(&value).ok_or_else(|| serde::de::Error::custom("string must not be empty"))
	}
}
