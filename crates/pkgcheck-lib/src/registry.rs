//! The package registry the walker resolves packages against.
//!
//! Registries never block, every call hands back a [`Request`] which is polled until it completes.

use thiserror::Error;
use tokio::sync::oneshot;

use crate::SemanticVersion;

pub mod manifest;
pub use manifest::ManifestRegistry;

/// Errors a registry can complete a request with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
	/// The package name is malformed.
	#[error("invalid package name \"{0}\".")]
	InvalidName(String),
	/// No version was requested and the registry doesn't know which version to install.
	#[error("package \"{0}\" is not in the catalog.")]
	NotInCatalog(String),
	#[error("manifest error: {0}")]
	Manifest(String),
	/// The registry dropped the request without answering it.
	#[error("request was dropped before completing.")]
	Dropped,
}

/// Result of a registry search.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
	pub found: bool,
	/// `None` when the package is missing or its version isn't a semantic version.
	pub installed_version: Option<SemanticVersion>,
}

impl RegistryEntry {
	pub fn installed(version: SemanticVersion) -> Self {
		RegistryEntry { found: true, installed_version: Some(version) }
	}

	pub fn not_found() -> Self {
		RegistryEntry { found: false, installed_version: None }
	}
}

pub type RequestResult<T> = Result<T, RegistryError>;

#[derive(Debug)]
pub enum RequestStatus<T> {
	Pending,
	Complete(RequestResult<T>),
}

/// A non-blocking handle to an operation running inside a registry.
#[derive(Debug)]
pub struct Request<T> {
	receiver: oneshot::Receiver<RequestResult<T>>,
}

/// The registry's end of a [`Request`].
#[derive(Debug)]
pub struct Responder<T> {
	sender: oneshot::Sender<RequestResult<T>>,
}

impl<T> Request<T> {
	pub fn channel() -> (Responder<T>, Request<T>) {
		let (sender, receiver) = oneshot::channel();
		(Responder { sender }, Request { receiver })
	}

	/// A request that has already completed.
	pub fn ready(result: RequestResult<T>) -> Self {
		let (responder, request) = Self::channel();
		responder.respond(result);
		request
	}

	/// Checks if the operation has completed, taking its result if it has.
	///
	/// Once a result has been returned further polls report [`RegistryError::Dropped`].
	pub fn poll_status(&mut self) -> RequestStatus<T> {
		match self.receiver.try_recv() {
			Ok(result) => RequestStatus::Complete(result),
			Err(oneshot::error::TryRecvError::Empty) => RequestStatus::Pending,
			Err(oneshot::error::TryRecvError::Closed) => RequestStatus::Complete(Err(RegistryError::Dropped)),
		}
	}
}

impl<T> Responder<T> {
	/// Completes the request. Does nothing if the request has been dropped.
	pub fn respond(self, result: RequestResult<T>) {
		if self.sender.send(result).is_err() {
			log::trace!("request dropped before its result was delivered");
		}
	}
}

/// A source of packages which can be searched and installed to.
pub trait Registry {
	/// Looks up a package by name.
	fn search(&mut self, name: &str) -> Request<RegistryEntry>;

	/// Adds a package, or upgrades it in place when it is already present.
	///
	/// When `version` is `None` the registry picks the version to install.
	fn install(&mut self, name: &str, version: Option<&SemanticVersion>) -> Request<()>;
}

impl<R: Registry + ?Sized> Registry for &mut R {
	fn search(&mut self, name: &str) -> Request<RegistryEntry> {
		(**self).search(name)
	}

	fn install(&mut self, name: &str, version: Option<&SemanticVersion>) -> Request<()> {
		(**self).install(name, version)
	}
}

impl<R: Registry + ?Sized> Registry for Box<R> {
	fn search(&mut self, name: &str) -> Request<RegistryEntry> {
		(**self).search(name)
	}

	fn install(&mut self, name: &str, version: Option<&SemanticVersion>) -> Request<()> {
		(**self).install(name, version)
	}
}
