//! Decides when a package check should run and runs it.
//!
//! The last checker version that completed is saved to disk as a [`CheckerState`].
//! A check only runs when that version is below [`Config::target_version()`](crate::Config::target_version())
//! or when forced, so bumping the target version whenever the package list changes makes the check run once more.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Serialize, Deserialize};

use crate::registry::Registry;
use crate::walker::{DependencyWalker, WalkReport};
use crate::{Config, PackageSpec};

/// Persisted record of the last completed check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckerState {
	pub version: i32,
}

impl Default for CheckerState {
	fn default() -> Self {
		Self { version: -1 }
	}
}

impl CheckerState {
	/// Loads the state at `path`, creating and saving a default state if there is no file.
	///
	/// # Errors
	/// - [`IO`](crate::Error::IO) when reading or writing the file.
	/// - [`SerdeJSON`](crate::Error::SerdeJSON) when the file can't be deserialized.
	pub fn load_or_create(path: impl AsRef<Path>) -> crate::Result<Self> {
		let path = path.as_ref();
		match std::fs::File::open(path) {
			Ok(file) => {
				log::debug!("Loading checker state from {}", path.display());
				Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
			},
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				log::debug!("Creating checker state at {}", path.display());
				let state = Self::default();
				state.save(path)?;
				Ok(state)
			},
			Err(e) => Err(e.into()),
		}
	}

	pub fn save(&self, path: impl AsRef<Path>) -> crate::Result<()> {
		let path = path.as_ref();
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		let file = std::fs::File::create(path)?;
		serde_json::to_writer_pretty(file, self)?;
		Ok(())
	}
}

/// Something that can be too busy for packages to be changed, such as an editor that is compiling.
pub trait HostActivity {
	fn is_busy(&self) -> bool;

	/// When true the check is skipped instead of waited on, for example while an editor is in play mode.
	fn should_skip(&self) -> bool { false }
}

/// A host that is always idle.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverBusy;

impl HostActivity for NeverBusy {
	fn is_busy(&self) -> bool { false }
}

/// Treats the host as busy while a lock file exists.
///
/// A second marker file can be given which skips the check entirely while it exists.
#[derive(Debug, Clone)]
pub struct LockFileActivity {
	path: PathBuf,
	skip_path: Option<PathBuf>,
}

impl LockFileActivity {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into(), skip_path: None }
	}

	pub fn with_skip_file(mut self, path: impl Into<PathBuf>) -> Self {
		self.skip_path = Some(path.into());
		self
	}
}

impl HostActivity for LockFileActivity {
	fn is_busy(&self) -> bool {
		self.path.exists()
	}

	fn should_skip(&self) -> bool {
		self.skip_path.as_ref().is_some_and(|p| p.exists())
	}
}

/// Polls `host` every `interval` until it is no longer busy.
pub async fn wait_until_idle(host: &impl HostActivity, interval: Duration) {
	if !host.is_busy() {
		return
	}
	log::info!("Host is busy, waiting before checking packages");
	while host.is_busy() {
		tokio::time::sleep(interval).await;
	}
	log::debug!("Host is idle");
}

pub struct PackageChecker {
	config: Config,
}

impl PackageChecker {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Checks if a walk should run given the saved `state`.
	pub fn should_check(&self, state: &CheckerState, force: bool) -> bool {
		force || state.version < self.config.target_version()
	}

	/// Parses the configured package specifiers.
	///
	/// Specifiers that can't be parsed are logged and left out so one bad entry doesn't stop the others being checked.
	pub fn package_specs(&self) -> Vec<PackageSpec> {
		self.config.packages()
			.iter()
			.filter_map(|s| match PackageSpec::parse(s) {
				Ok(spec) => Some(spec),
				Err(e) => {
					log::warn!("Skipping invalid package specifier \"{}\": {}", s, e);
					None
				},
			})
			.collect()
	}

	/// Walks the configured packages against `registry` if the saved state is behind the target version.
	///
	/// The state is updated to the target version once the walk completes.
	///
	/// # Returns
	/// `None` when the check was skipped, otherwise the report of the walk.
	///
	/// # Errors
	/// - [`IO`](crate::Error::IO) and [`SerdeJSON`](crate::Error::SerdeJSON) when loading or saving the state.
	pub async fn check_packages<R: Registry>(&self, registry: R, force: bool) -> crate::Result<Option<WalkReport>> {
		let mut state = CheckerState::load_or_create(self.config.state_path())?;
		if !self.should_check(&state, force) {
			log::info!("Packages already checked for version {}, skipping", state.version);
			return Ok(None)
		}

		let mut walker = DependencyWalker::new(registry);
		let report = walker.run(self.package_specs(), self.config.tick_interval()).await?.clone();

		state.version = self.config.target_version();
		state.save(self.config.state_path())?;

		Ok(Some(report))
	}

	/// Same as [`check_packages()`](Self::check_packages()) but first waits for `host` to be idle.
	///
	/// Returns `None` without touching the state when the host asks for the check to be skipped.
	pub async fn check_packages_when_idle<R: Registry>(&self, registry: R, host: &impl HostActivity, force: bool) -> crate::Result<Option<WalkReport>> {
		if host.should_skip() {
			log::info!("Host asked to skip the package check");
			return Ok(None)
		}
		wait_until_idle(host, self.config.tick_interval()).await;
		self.check_packages(registry, force).await
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn checker_state_defaults_below_any_target() {
		let checker = PackageChecker::new(Config::default());
		assert!(checker.should_check(&CheckerState::default(), false));
		assert!(!checker.should_check(&CheckerState { version: 1 }, false));
		assert!(!checker.should_check(&CheckerState { version: 2 }, false));
		assert!(checker.should_check(&CheckerState { version: 1 }, true));
	}

	#[test]
	fn checker_skips_invalid_specifiers() {
		let mut config = Config::default();
		config.set_packages(vec!["a@1.0.0".into(), "@2.0.0".into(), "b@nope".into(), "c".into()]);
		let names = PackageChecker::new(config).package_specs().into_iter().map(|s| s.name).collect::<Vec<_>>();
		assert_eq!(names, ["a", "c"]);
	}

	#[test]
	fn lock_file_activity() {
		let dir = tempfile::tempdir().unwrap();
		let lock = dir.path().join("lock");
		let host = LockFileActivity::new(&lock);
		assert!(!host.is_busy());
		std::fs::write(&lock, "").unwrap();
		assert!(host.is_busy());
		assert!(!host.should_skip());
	}

	#[test]
	fn lock_file_activity_skip_file() {
		let dir = tempfile::tempdir().unwrap();
		let playing = dir.path().join("playing");
		let host = LockFileActivity::new(dir.path().join("lock")).with_skip_file(&playing);
		assert!(!host.should_skip());
		std::fs::write(&playing, "").unwrap();
		assert!(host.should_skip());
		assert!(!host.is_busy());
		assert!(!NeverBusy.should_skip());
	}
}
