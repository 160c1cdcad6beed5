pub mod error;
pub use error::Result;
pub use error::Error;

pub mod version;
pub use version::SemanticVersion;

pub mod spec;
pub use spec::PackageSpec;

pub mod config;
pub use config::Config;

pub mod registry;
pub use registry::Registry;

pub mod walker;
pub use walker::DependencyWalker;

pub mod checker;
pub use checker::PackageChecker;
