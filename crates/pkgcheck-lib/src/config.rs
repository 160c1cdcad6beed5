use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};

/// Settings for a package check.
///
/// Stored as JSON, every key is optional and falls back to [`Config::default()`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	/// Bump this whenever `packages` changes so the check runs again.
	target_version: i32,
	/// Package specifiers in the order they are checked.
	packages: Vec<String>,
	manifest_path: PathBuf,
	state_path: PathBuf,
	/// Package name to version, used when installing without a version.
	catalog: BTreeMap<String, String>,
	tick_interval_ms: u64,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			target_version: 1,
			packages: vec!["com.unity.cinemachine".to_string()],
			manifest_path: PathBuf::from("Packages/manifest.json"),
			state_path: PathBuf::from("PackageChecker/state.json"),
			catalog: Default::default(),
			tick_interval_ms: 50,
		}
	}
}

impl Config {
	/// Where [`load_from_disk()`](Config::load_from_disk()) looks for the config file.
	///
	/// # Errors
	/// - [`IO`](crate::Error::IO) when no data directory can be determined from the environment.
	pub fn default_path() -> crate::Result<PathBuf> {
		#[cfg(target_os = "windows")]
		let path = PathBuf::from(std::env::var("APPDATA").map_err(|_| env_missing("APPDATA"))?);

		#[cfg(not(target_os = "windows"))]
		let path = if let Ok(e) = std::env::var("XDG_DATA_HOME") {
			PathBuf::from(e)
		} else {
			PathBuf::from(std::env::var("HOME").map_err(|_| env_missing("HOME"))?).join(".local/share")
		};

		Ok(path.join("pkgcheck").join("config.json"))
	}

	/// Loads the config from the default path.
	///
	/// # Errors
	/// - [`IO`](crate::Error::IO) when opening or reading from the file.
	/// - [`SerdeJSON`](crate::Error::SerdeJSON) when deserializing the file.
	pub fn load_from_disk() -> crate::Result<Self> {
		Self::load_from_file(Self::default_path()?)
	}

	/// Loads the config from a file at a given path.
	///
	/// # Errors
	/// - [`IO`](crate::Error::IO) when opening or reading from the file.
	/// - [`SerdeJSON`](crate::Error::SerdeJSON) when deserializing the file.
	pub fn load_from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
		let path = path.as_ref();
		log::debug!("Loading config from {}", path.display());
		let file = std::fs::File::open(path)?;
		Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
	}

	pub fn save_to_file(&self, path: impl AsRef<Path>) -> crate::Result<()> {
		let path = path.as_ref();
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		let file = std::fs::File::create(path)?;
		serde_json::to_writer_pretty(file, self)?;
		Ok(())
	}

	pub fn target_version(&self) -> i32 {
		self.target_version
	}
	pub fn set_target_version(&mut self, target_version: i32) {
		self.target_version = target_version;
	}

	pub fn packages(&self) -> &[String] {
		&self.packages
	}
	pub fn set_packages(&mut self, packages: Vec<String>) {
		self.packages = packages;
	}

	pub fn manifest_path(&self) -> &Path {
		&self.manifest_path
	}
	pub fn set_manifest_path(&mut self, manifest_path: PathBuf) {
		self.manifest_path = manifest_path;
	}

	pub fn state_path(&self) -> &Path {
		&self.state_path
	}
	pub fn set_state_path(&mut self, state_path: PathBuf) {
		self.state_path = state_path;
	}

	pub fn catalog(&self) -> &BTreeMap<String, String> {
		&self.catalog
	}
	pub fn set_catalog(&mut self, catalog: BTreeMap<String, String>) {
		self.catalog = catalog;
	}

	pub fn tick_interval(&self) -> std::time::Duration {
		std::time::Duration::from_millis(self.tick_interval_ms)
	}
	pub fn set_tick_interval(&mut self, interval: std::time::Duration) {
		self.tick_interval_ms = interval.as_millis() as u64;
	}
}

fn env_missing(var: &str) -> crate::Error {
	crate::Error::IO(std::io::Error::new(std::io::ErrorKind::NotFound, format!("{} environment variable not set.", var)))
}
