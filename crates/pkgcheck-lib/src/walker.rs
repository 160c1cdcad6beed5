//! Walks a list of package specifiers, installing or upgrading anything that isn't satisfied.
//!
//! # Usage
//! 1. Create a [`DependencyWalker`] around a [`Registry`].
//! 1. [`DependencyWalker::start()`] with the specifiers to check and a completion hook.
//! 1. [`DependencyWalker::tick()`] repeatedly until it returns [`WalkStatus::Complete`],
//! or let [`DependencyWalker::drive()`] do the ticking on the tokio runtime.
//! 1. [`DependencyWalker::report()`] to see what happened to each package.
//!
//! # Resolution
//! Packages are resolved strictly in list order with at most one registry request in flight.
//! For each package the registry is searched, then
//! - a failed search is logged and the package skipped,
//! - a package that is missing, or older than its minimum version, is installed,
//! - anything else is left alone.
//!
//! Install results never stop the walk, the outcome is recorded and the walk moves on.

use std::time::Duration;

use crate::registry::*;
use crate::PackageSpec;

/// What happened to a single package during a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
	/// Installed at or above the required version.
	Satisfied,
	/// Was missing or out of date and an install completed.
	Installed,
	/// Was missing or out of date and the install completed with an error.
	InstallFailed(RegistryError),
	/// The search itself failed so the package was skipped.
	LookupFailed(RegistryError),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WalkReport {
	/// Outcomes in the order the packages were visited.
	pub items: Vec<(PackageSpec, ItemOutcome)>,
}

impl WalkReport {
	pub fn installed(&self) -> impl Iterator<Item = &PackageSpec> {
		self.items.iter().filter(|(_, o)| matches!(o, ItemOutcome::Installed)).map(|(s, _)| s)
	}

	pub fn failures(&self) -> impl Iterator<Item = &(PackageSpec, ItemOutcome)> {
		self.items.iter().filter(|(_, o)| matches!(o, ItemOutcome::InstallFailed(_) | ItemOutcome::LookupFailed(_)))
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStatus {
	/// No walk has been started.
	Idle,
	InProgress,
	Complete,
}

#[derive(Debug)]
enum WalkState {
	Idle,
	Searching(usize, Request<RegistryEntry>),
	Installing(usize, Request<()>),
	Complete,
}

pub type CompletionHook = Box<dyn FnOnce() + Send>;

pub struct DependencyWalker<R> {
	registry: R,
	specs: Vec<PackageSpec>,
	state: WalkState,
	on_complete: Option<CompletionHook>,
	report: WalkReport,
}

impl<R: Registry> DependencyWalker<R> {
	pub fn new(registry: R) -> Self {
		Self {
			registry,
			specs: Default::default(),
			state: WalkState::Idle,
			on_complete: None,
			report: Default::default(),
		}
	}

	/// Begins a walk over `specs`. Does not block, the walk progresses through [`tick()`](Self::tick()).
	///
	/// `on_complete` is called exactly once when the last package has been resolved.
	/// With an empty list that happens before this returns.
	///
	/// # Errors
	/// - [`WalkInProgress`](crate::Error::WalkInProgress) when a previous walk hasn't completed.
	pub fn start(&mut self, specs: impl IntoIterator<Item = PackageSpec>, on_complete: impl FnOnce() + Send + 'static) -> crate::Result<()> {
		if self.status() == WalkStatus::InProgress {
			return Err(crate::Error::WalkInProgress)
		}

		self.specs = specs.into_iter().collect();
		self.report = Default::default();
		self.on_complete = Some(Box::new(on_complete));

		log::info!("Checking {} package dependencies", self.specs.len());
		self.state = self.advance(None);
		Ok(())
	}

	/// Checks the in-flight request and moves the walk forward if it has completed.
	pub fn tick(&mut self) -> WalkStatus {
		let state = std::mem::replace(&mut self.state, WalkState::Idle);
		self.state = match state {
			WalkState::Searching(index, mut request) => match request.poll_status() {
				RequestStatus::Pending => WalkState::Searching(index, request),
				RequestStatus::Complete(result) => self.resolve_search(index, result),
			},
			WalkState::Installing(index, mut request) => match request.poll_status() {
				RequestStatus::Pending => WalkState::Installing(index, request),
				RequestStatus::Complete(result) => {
					let spec = &self.specs[index];
					let outcome = match result {
						Ok(()) => {
							log::info!("Installed {}", spec);
							ItemOutcome::Installed
						},
						Err(e) => {
							log::warn!("Failed to install {}: {}", spec, e);
							ItemOutcome::InstallFailed(e)
						},
					};
					self.report.items.push((spec.clone(), outcome));
					self.advance(Some(index))
				},
			},
			s => s,
		};
		self.status()
	}

	/// Ticks the walk every `interval` until it is no longer in progress.
	pub async fn drive(&mut self, interval: Duration) -> WalkStatus {
		let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
		ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
		loop {
			ticker.tick().await;
			match self.tick() {
				WalkStatus::InProgress => continue,
				status => return status,
			}
		}
	}

	/// Starts a walk and drives it to completion.
	///
	/// # Errors
	/// - [`WalkInProgress`](crate::Error::WalkInProgress) when a previous walk hasn't completed.
	pub async fn run(&mut self, specs: impl IntoIterator<Item = PackageSpec>, interval: Duration) -> crate::Result<&WalkReport> {
		self.start(specs, || {})?;
		self.drive(interval).await;
		Ok(&self.report)
	}

	pub fn status(&self) -> WalkStatus {
		match self.state {
			WalkState::Idle => WalkStatus::Idle,
			WalkState::Searching(..) | WalkState::Installing(..) => WalkStatus::InProgress,
			WalkState::Complete => WalkStatus::Complete,
		}
	}

	/// Index of the package currently being resolved.
	pub fn current_index(&self) -> Option<usize> {
		match self.state {
			WalkState::Searching(i, _) | WalkState::Installing(i, _) => Some(i),
			_ => None,
		}
	}

	pub fn report(&self) -> &WalkReport {
		&self.report
	}

	pub fn registry(&self) -> &R {
		&self.registry
	}

	pub fn registry_mut(&mut self) -> &mut R {
		&mut self.registry
	}

	fn resolve_search(&mut self, index: usize, result: RequestResult<RegistryEntry>) -> WalkState {
		let spec = &self.specs[index];
		match result {
			Err(e) => {
				log::warn!("Checking for invalid package. Please check the name is correct: {} ({})", spec, e);
				self.report.items.push((spec.clone(), ItemOutcome::LookupFailed(e)));
				self.advance(Some(index))
			},
			Ok(entry) if entry.found && spec.is_satisfied_by(entry.installed_version.as_ref()) => {
				log::debug!("{} is up to date", spec);
				self.report.items.push((spec.clone(), ItemOutcome::Satisfied));
				self.advance(Some(index))
			},
			Ok(entry) => {
				match (entry.found, &entry.installed_version) {
					(false, _) => log::info!("{} is not installed, installing", spec),
					(true, Some(v)) => log::info!("{} is out of date (installed {}), upgrading", spec, v),
					(true, None) => log::info!("{} has an unknown installed version, upgrading", spec),
				}
				let request = self.registry.install(&spec.name, spec.min_version.as_ref());
				WalkState::Installing(index, request)
			},
		}
	}

	/// Moves past `previous`, searching for the next package or completing the walk.
	fn advance(&mut self, previous: Option<usize>) -> WalkState {
		let next = previous.map_or(0, |i| i + 1);
		if let Some(spec) = self.specs.get(next) {
			log::trace!("Searching for {}", spec);
			WalkState::Searching(next, self.registry.search(&spec.name))
		} else {
			log::info!("Package dependency check complete");
			if let Some(on_complete) = self.on_complete.take() {
				on_complete();
			}
			WalkState::Complete
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Arc;

	/// Never answers on its own, searches are answered by the test.
	#[derive(Default)]
	struct HeldRegistry {
		searches: Vec<(String, Responder<RegistryEntry>)>,
		installs: Vec<(String, Responder<()>)>,
	}

	impl Registry for HeldRegistry {
		fn search(&mut self, name: &str) -> Request<RegistryEntry> {
			let (responder, request) = Request::channel();
			self.searches.push((name.to_string(), responder));
			request
		}

		fn install(&mut self, name: &str, _version: Option<&crate::SemanticVersion>) -> Request<()> {
			let (responder, request) = Request::channel();
			self.installs.push((name.to_string(), responder));
			request
		}
	}

	fn specs(names: &[&str]) -> Vec<PackageSpec> {
		names.iter().map(|n| PackageSpec::parse(n).unwrap()).collect()
	}

	#[test]
	fn walker_idle_before_start() {
		let mut walker = DependencyWalker::new(HeldRegistry::default());
		assert_eq!(walker.tick(), WalkStatus::Idle);
		assert!(walker.registry().searches.is_empty());
	}

	#[test]
	fn walker_waits_on_pending_search() {
		let mut walker = DependencyWalker::new(HeldRegistry::default());
		walker.start(specs(&["a", "b"]), || {}).unwrap();
		for _ in 0..5 {
			assert_eq!(walker.tick(), WalkStatus::InProgress);
		}
		assert_eq!(walker.registry().searches.len(), 1);
		assert_eq!(walker.current_index(), Some(0));
	}

	#[test]
	fn walker_start_while_in_progress_is_err() {
		let mut walker = DependencyWalker::new(HeldRegistry::default());
		walker.start(specs(&["a"]), || {}).unwrap();
		assert!(matches!(walker.start(specs(&["b"]), || {}), Err(crate::Error::WalkInProgress)));
		assert_eq!(walker.registry().searches.len(), 1);
	}

	#[test]
	fn walker_empty_list_completes_on_start() {
		let count = Arc::new(AtomicUsize::new(0));
		let hook_count = count.clone();
		let mut walker = DependencyWalker::new(HeldRegistry::default());
		walker.start(Vec::new(), move || { hook_count.fetch_add(1, Ordering::SeqCst); }).unwrap();
		assert_eq!(walker.status(), WalkStatus::Complete);
		assert_eq!(walker.tick(), WalkStatus::Complete);
		assert_eq!(count.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn walker_dropped_search_is_skipped() {
		let mut walker = DependencyWalker::new(HeldRegistry::default());
		walker.start(specs(&["a", "b"]), || {}).unwrap();

		walker.registry.searches.clear();
		walker.tick();
		assert_eq!(walker.report().items, vec![(PackageSpec::parse("a").unwrap(), ItemOutcome::LookupFailed(RegistryError::Dropped))]);
		assert_eq!(walker.current_index(), Some(1));
		assert!(walker.registry().installs.is_empty());
	}

	#[test]
	fn walker_can_restart_after_complete() {
		let mut walker = DependencyWalker::new(HeldRegistry::default());
		walker.start(specs(&["a"]), || {}).unwrap();
		let (_, responder) = walker.registry.searches.remove(0);
		responder.respond(Ok(RegistryEntry { found: true, installed_version: None }));
		assert_eq!(walker.tick(), WalkStatus::Complete);

		walker.start(specs(&["b"]), || {}).unwrap();
		assert_eq!(walker.status(), WalkStatus::InProgress);
		assert_eq!(walker.registry().searches[0].0, "b");
		assert!(walker.report().items.is_empty());
	}
}
