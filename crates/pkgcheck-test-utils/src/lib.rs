//! Various helper functions for testing
//!
//! functions in this module should use results and not use any panics to avoid confusion in callers

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use pkgcheck::registry::*;
use pkgcheck::SemanticVersion;

/// A call made to a [`ScriptedRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
	Search(String),
	Install(String, Option<SemanticVersion>),
}

impl Call {
	pub fn search(name: &str) -> Self {
		Call::Search(name.to_string())
	}

	/// # Errors
	/// When `version` isn't a valid version.
	pub fn install(name: &str, version: Option<&str>) -> pkgcheck::Result<Self> {
		Ok(Call::Install(name.to_string(), version.map(SemanticVersion::new).transpose()?))
	}
}

/// Shared view of the calls a [`ScriptedRegistry`] has received, usable after the registry is moved into a walker.
#[derive(Debug, Default, Clone)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
	pub fn calls(&self) -> Vec<Call> {
		self.0.lock().map(|c| c.clone()).unwrap_or_default()
	}

	fn push(&self, call: Call) {
		if let Ok(mut calls) = self.0.lock() {
			calls.push(call);
		}
	}
}

/// A registry answering from a fixed script.
///
/// Packages not in the script are reported as not found, installs succeed unless told otherwise.
/// When `hold` is set requests stay pending until [`release_all()`](ScriptedRegistry::release_all()) is called.
#[derive(Debug, Default)]
pub struct ScriptedRegistry {
	entries: HashMap<String, RequestResult<RegistryEntry>>,
	failing_installs: HashMap<String, RegistryError>,
	hold: bool,
	held_searches: Vec<(Responder<RegistryEntry>, RequestResult<RegistryEntry>)>,
	held_installs: Vec<(Responder<()>, RequestResult<()>)>,
	log: CallLog,
}

impl ScriptedRegistry {
	pub fn new() -> Self {
		Default::default()
	}

	/// # Errors
	/// When `version` isn't a valid version.
	pub fn installed(mut self, name: &str, version: &str) -> pkgcheck::Result<Self> {
		self.entries.insert(name.to_string(), Ok(RegistryEntry::installed(SemanticVersion::new(version)?)));
		Ok(self)
	}

	pub fn entry(mut self, name: &str, entry: RequestResult<RegistryEntry>) -> Self {
		self.entries.insert(name.to_string(), entry);
		self
	}

	pub fn lookup_error(self, name: &str) -> Self {
		let error = RegistryError::InvalidName(name.to_string());
		self.entry(name, Err(error))
	}

	pub fn install_error(mut self, name: &str, error: RegistryError) -> Self {
		self.failing_installs.insert(name.to_string(), error);
		self
	}

	pub fn hold(mut self) -> Self {
		self.hold = true;
		self
	}

	pub fn call_log(&self) -> CallLog {
		self.log.clone()
	}

	pub fn pending(&self) -> usize {
		self.held_searches.len() + self.held_installs.len()
	}

	/// Completes every held request.
	pub fn release_all(&mut self) {
		for (responder, result) in self.held_searches.drain(..) {
			responder.respond(result);
		}
		for (responder, result) in self.held_installs.drain(..) {
			responder.respond(result);
		}
	}
}

impl Registry for ScriptedRegistry {
	fn search(&mut self, name: &str) -> Request<RegistryEntry> {
		self.log.push(Call::Search(name.to_string()));
		let result = self.entries.get(name).cloned().unwrap_or_else(|| Ok(RegistryEntry::not_found()));
		if self.hold {
			let (responder, request) = Request::channel();
			self.held_searches.push((responder, result));
			request
		} else {
			Request::ready(result)
		}
	}

	fn install(&mut self, name: &str, version: Option<&SemanticVersion>) -> Request<()> {
		self.log.push(Call::Install(name.to_string(), version.cloned()));
		let result = match self.failing_installs.get(name) {
			Some(e) => Err(e.clone()),
			None => Ok(()),
		};
		if self.hold {
			let (responder, request) = Request::channel();
			self.held_installs.push((responder, result));
			request
		} else {
			Request::ready(result)
		}
	}
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("JSON error: {0}")]
	SerdeJSON(#[from] serde_json::Error),
}

/// Writes a manifest with the given dependencies to `path`.
pub fn write_manifest(path: impl AsRef<Path>, dependencies: &[(&str, &str)]) -> Result<(), ManifestError> {
	let deps = dependencies.iter()
		.map(|(name, version)| (name.to_string(), serde_json::Value::String(version.to_string())))
		.collect::<serde_json::Map<_, _>>();
	let manifest = serde_json::json!({ "dependencies": deps });
	std::fs::write(path, serde_json::to_string_pretty(&manifest)?)?;
	Ok(())
}

/// Reads the `dependencies` of the manifest at `path`.
pub fn read_manifest_dependencies(path: impl AsRef<Path>) -> Result<HashMap<String, String>, ManifestError> {
	let manifest: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
	Ok(manifest.get("dependencies")
		.and_then(|d| d.as_object())
		.map(|d| d.iter().filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string()))).collect())
		.unwrap_or_default())
}

/// Creates a temporary project directory for manifest and state files.
pub fn project_dir() -> Result<tempfile::TempDir, ManifestError> {
	Ok(tempfile::tempdir()?)
}
