//! Semantic version numbers used for package requirements.
//!
//! # Format
//!
//! `MAJOR`.`MINOR`.`PATCH`[-`PRERELEASE`][+`BUILD`]
//!
//! For example: `2.2.10-preview.3`
//!
//! Parsing is handed to [`semver::Version`] after two relaxations:
//! - A leading `v` is ignored.
//! - A missing `MINOR` or `PATCH` is read as `0` so `1.2` and `1.2.0` are the same version.

use std::cmp::Ordering;

use serde::*;

/// Represents a single semantic version.
///
/// # Eq & Ord
///
/// Ordering is semantic versioning precedence, see [`semver::Version::cmp_precedence()`].
/// The `build` metadata is not considered in Eq and Ord.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SemanticVersion(semver::Version);

impl SemanticVersion {
	/// Create a new [`SemanticVersion`] from a version string.
	///
	/// # Errors
	/// This function will return a [`Parse`](crate::Error::Parse) error when the input,
	/// after dropping a leading `v` and filling in missing components, is not a valid semantic version.
	pub fn new(s: impl AsRef<str>) -> crate::Result<Self> {
		let original = s.as_ref();
		semver::Version::parse(&normalize(original))
			.map(SemanticVersion)
			.map_err(|e| crate::Error::Parse(format!("\"{}\" is not a version: {}", original, e)))
	}

	pub fn major(&self) -> u64 { self.0.major }
	pub fn minor(&self) -> u64 { self.0.minor }
	pub fn patch(&self) -> u64 { self.0.patch }
	pub fn prerelease(&self) -> &semver::Prerelease { &self.0.pre }
	pub fn build(&self) -> &semver::BuildMetadata { &self.0.build }
}

/// Pads `X` and `X.Y` out to `X.Y.Z`, keeping any prerelease or build suffix.
fn normalize(s: &str) -> String {
	let s = s.trim();
	let s = s.strip_prefix('v').unwrap_or(s);
	let (core, suffix) = s.split_at(s.find(|c: char| c == '-' || c == '+').unwrap_or(s.len()));
	let padding = match core.split('.').count() {
		1 => ".0.0",
		2 => ".0",
		_ => "",
	};
	format!("{}{}{}", core, padding, suffix)
}

impl TryFrom<&str> for SemanticVersion {
	type Error = crate::Error;

	fn try_from(value: &str) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}

impl TryFrom<String> for SemanticVersion {
	type Error = crate::Error;
	fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl std::str::FromStr for SemanticVersion {
	type Err = crate::Error;
	fn from_str(s: &str) -> Result<Self, Self::Err> { Self::new(s) }
}

impl From<semver::Version> for SemanticVersion {
	fn from(value: semver::Version) -> Self {
		SemanticVersion(value)
	}
}

impl From<SemanticVersion> for String {
	fn from(value: SemanticVersion) -> Self {
		value.to_string()
	}
}

impl PartialEq for SemanticVersion {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}

impl Eq for SemanticVersion {}

impl Ord for SemanticVersion {
	fn cmp(&self, other: &Self) -> Ordering {
		self.0.cmp_precedence(&other.0)
	}
}

impl PartialOrd for SemanticVersion {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl std::hash::Hash for SemanticVersion {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.0.major.hash(state);
		self.0.minor.hash(state);
		self.0.patch.hash(state);
		self.0.pre.hash(state);
	}
}

impl std::fmt::Display for SemanticVersion {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Display::fmt(&self.0, f)
	}
}
