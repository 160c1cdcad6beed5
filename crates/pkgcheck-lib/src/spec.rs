//! Package specifiers such as `com.unity.cinemachine@2.2.10`.

use serde::*;
use try_map::FallibleMapExt;

use crate::SemanticVersion;

/// A requested package dependency.
///
/// # Format
/// `name[@version]`, the string is split on the first `@`.
/// When a version is present it is the *minimum* version required, any installed version at or above it is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageSpec {
	pub name: String,
	pub min_version: Option<SemanticVersion>,
}

impl PackageSpec {
	pub fn new(name: impl Into<String>, min_version: Option<SemanticVersion>) -> Self {
		PackageSpec { name: name.into(), min_version }
	}

	/// Parses a specifier string.
	///
	/// # Errors
	/// - [`Parse`](crate::Error::Parse) when the name is empty or the version can't be parsed.
	pub fn parse(s: impl AsRef<str>) -> crate::Result<Self> {
		let s = s.as_ref().trim();
		let (name, version) = match s.split_once('@') {
			Some((name, version)) => (name.trim(), Some(version)),
			None => (s, None),
		};

		if name.is_empty() {
			return Err(crate::Error::Parse(format!("package specifier \"{}\" has no name", s)))
		}

		let min_version = version.try_map(SemanticVersion::new)?;

		Ok(PackageSpec { name: name.to_string(), min_version })
	}

	/// Checks if an installed version fulfills this requirement.
	///
	/// An unknown installed version only satisfies a requirement without a minimum.
	pub fn is_satisfied_by(&self, installed: Option<&SemanticVersion>) -> bool {
		match (&self.min_version, installed) {
			(None, _) => true,
			(Some(min), Some(installed)) => installed >= min,
			(Some(_), None) => false,
		}
	}
}

impl TryFrom<&str> for PackageSpec {
	type Error = crate::Error;
	fn try_from(value: &str) -> Result<Self, Self::Error> { Self::parse(value) }
}

impl std::str::FromStr for PackageSpec {
	type Err = crate::Error;
	fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s) }
}

impl std::fmt::Display for PackageSpec {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match &self.min_version {
			Some(v) => write!(f, "{}@{}", self.name, v),
			None => write!(f, "{}", self.name),
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn spec_without_version() {
		let spec = PackageSpec::parse("com.unity.cinemachine").unwrap();
		assert_eq!(spec.name, "com.unity.cinemachine");
		assert_eq!(spec.min_version, None);
	}

	#[test]
	fn spec_with_version() {
		let spec = PackageSpec::parse("com.unity.cinemachine@2.2.10-preview.3").unwrap();
		assert_eq!(spec.name, "com.unity.cinemachine");
		assert_eq!(spec.min_version, Some(SemanticVersion::new("2.2.10-preview.3").unwrap()));
	}

	#[test]
	fn spec_splits_on_first_at() {
		assert!(PackageSpec::parse("pkg@1.0.0@2.0.0").is_err());
	}

	#[test] fn spec_empty_name_is_err() { assert!(PackageSpec::parse("@1.0.0").is_err()) }
	#[test] fn spec_empty_is_err() { assert!(PackageSpec::parse("  ").is_err()) }
	#[test] fn spec_bad_version_is_err() { assert!(PackageSpec::parse("pkg@latest").is_err()) }
	#[test] fn spec_display() { assert_eq!(PackageSpec::parse("pkg@1.2").unwrap().to_string(), "pkg@1.2.0") }

	#[test]
	fn spec_satisfaction() {
		let spec = PackageSpec::parse("pkg@1.2.0").unwrap();
		assert!(spec.is_satisfied_by(Some(&SemanticVersion::new("1.2.0").unwrap())));
		assert!(spec.is_satisfied_by(Some(&SemanticVersion::new("1.3.0").unwrap())));
		assert!(!spec.is_satisfied_by(Some(&SemanticVersion::new("1.1.9").unwrap())));
		assert!(!spec.is_satisfied_by(None));
		assert!(PackageSpec::parse("pkg").unwrap().is_satisfied_by(None));
	}
}
