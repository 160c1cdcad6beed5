//! A registry backed by a project's package manifest.
//!
//! The manifest is a JSON file with a `dependencies` object mapping package names to version strings:
//! ```json
//! { "dependencies": { "com.unity.cinemachine": "2.2.10" } }
//! ```
//! Other keys in the file are preserved when it is rewritten.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::*;

/// Searches and installs packages by reading and rewriting a manifest file.
///
/// Every request runs on a spawned tokio task so calls must be made from within a tokio runtime.
#[derive(Debug, Clone)]
pub struct ManifestRegistry {
	manifest_path: PathBuf,
	/// Versions the registry can install when no version is requested.
	catalog: HashMap<String, SemanticVersion>,
	name_pattern: regex::Regex,
}

impl ManifestRegistry {
	pub fn new(manifest_path: impl Into<PathBuf>) -> Self {
		Self {
			manifest_path: manifest_path.into(),
			catalog: Default::default(),
			name_pattern: regex::Regex::new(r"^[a-z0-9][a-z0-9._-]*$").expect("package name pattern should be valid."),
		}
	}

	/// Creates a registry using the manifest path and catalog from `config`.
	///
	/// # Errors
	/// - [`Parse`](crate::Error::Parse) when a catalog version can't be parsed.
	pub fn from_config(config: &crate::Config) -> crate::Result<Self> {
		let mut catalog = HashMap::new();
		for (name, version) in config.catalog() {
			catalog.insert(name.clone(), SemanticVersion::new(version)?);
		}
		Ok(Self::new(config.manifest_path()).with_catalog(catalog))
	}

	pub fn with_catalog(mut self, catalog: impl IntoIterator<Item = (String, SemanticVersion)>) -> Self {
		self.catalog.extend(catalog);
		self
	}

	pub fn manifest_path(&self) -> &Path {
		&self.manifest_path
	}

	pub fn catalog(&self) -> &HashMap<String, SemanticVersion> {
		&self.catalog
	}

	fn is_valid_name(&self, name: &str) -> bool {
		self.name_pattern.is_match(name)
	}

	/// Picks the version an install should write.
	///
	/// The catalog version wins when it is newer than the requested one.
	fn version_to_install(&self, name: &str, requested: Option<&SemanticVersion>) -> RequestResult<SemanticVersion> {
		match (requested, self.catalog.get(name)) {
			(Some(requested), Some(available)) if available > requested => Ok(available.clone()),
			(Some(requested), _) => Ok(requested.clone()),
			(None, Some(available)) => Ok(available.clone()),
			(None, None) => Err(RegistryError::NotInCatalog(name.to_string())),
		}
	}
}

impl Registry for ManifestRegistry {
	fn search(&mut self, name: &str) -> Request<RegistryEntry> {
		if !self.is_valid_name(name) {
			return Request::ready(Err(RegistryError::InvalidName(name.to_string())))
		}

		let (responder, request) = Request::channel();
		let path = self.manifest_path.clone();
		let name = name.to_string();
		tokio::spawn(async move {
			log::trace!("Searching manifest {} for {}", path.display(), name);
			let result = read_manifest(&path).await.map(|manifest| {
				match dependencies(&manifest).and_then(|deps| deps.get(&name)) {
					Some(version) => RegistryEntry {
						found: true,
						installed_version: version.as_str().and_then(|v| SemanticVersion::new(v).ok()),
					},
					None => RegistryEntry::not_found(),
				}
			});
			responder.respond(result);
		});
		request
	}

	fn install(&mut self, name: &str, version: Option<&SemanticVersion>) -> Request<()> {
		if !self.is_valid_name(name) {
			return Request::ready(Err(RegistryError::InvalidName(name.to_string())))
		}

		let version = match self.version_to_install(name, version) {
			Ok(v) => v,
			Err(e) => return Request::ready(Err(e)),
		};

		let (responder, request) = Request::channel();
		let path = self.manifest_path.clone();
		let name = name.to_string();
		tokio::spawn(async move {
			log::info!("Adding {}@{} to manifest {}", name, version, path.display());
			let result = add_dependency(&path, name, &version).await;
			responder.respond(result);
		});
		request
	}
}

/// Sets `name` to `version` in the manifest's dependencies.
async fn add_dependency(path: &Path, name: String, version: &SemanticVersion) -> RequestResult<()> {
	let mut manifest = read_manifest(path).await?;
	let root = manifest.as_object_mut().ok_or_else(|| RegistryError::Manifest("manifest root is not an object".into()))?;
	let deps = root.entry("dependencies").or_insert_with(|| Value::Object(Map::new()));
	let deps = deps.as_object_mut().ok_or_else(|| RegistryError::Manifest("`dependencies` is not an object".into()))?;
	deps.insert(name, Value::String(version.to_string()));
	write_manifest(path, &manifest).await
}

fn dependencies(manifest: &Value) -> Option<&Map<String, Value>> {
	manifest.get("dependencies").and_then(Value::as_object)
}

/// Reads a manifest, a missing file is an empty manifest.
async fn read_manifest(path: &Path) -> RequestResult<Value> {
	let data = match tokio::fs::read_to_string(path).await {
		Ok(data) => data,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Value::Object(Map::new())),
		Err(e) => return Err(RegistryError::Manifest(format!("failed to read {}: {}", path.display(), e))),
	};
	let manifest: Value = serde_json::from_str(&data).map_err(|e| RegistryError::Manifest(format!("failed to parse {}: {}", path.display(), e)))?;
	if !manifest.is_object() {
		return Err(RegistryError::Manifest(format!("{} is not a JSON object", path.display())))
	}
	Ok(manifest)
}

async fn write_manifest(path: &Path, manifest: &Value) -> RequestResult<()> {
	let io_err = |e: std::io::Error| RegistryError::Manifest(format!("failed to write {}: {}", path.display(), e));
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
	}
	let mut data = serde_json::to_string_pretty(manifest).map_err(|e| RegistryError::Manifest(e.to_string()))?;
	data.push('\n');
	tokio::fs::write(path, data).await.map_err(io_err)
}
