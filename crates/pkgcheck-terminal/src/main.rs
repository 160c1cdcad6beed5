use std::process::ExitCode;

use pkgcheck::checker::{LockFileActivity, NeverBusy, PackageChecker};
use pkgcheck::registry::ManifestRegistry;
use pkgcheck::walker::{ItemOutcome, WalkReport};

#[tokio::main]
async fn main() -> ExitCode {
	let opts;

	/* Parse console input */
	let parsed_options = {
		let args: Vec<String> = std::env::args().collect();

		let mut o = getopts::Options::new();
		o.optflag( "h", "help",      "Show help");
		o.optflag( "v", "verbose",   "Increased verbosity");
		o.optflag( "f", "force",     "Check packages even if this version has already been checked");
		o.optopt(  "c", "config",    "Config file to use instead of the default", "PATH");
		o.optopt(  "",  "wait-lock", "Wait for this lock file to be removed before checking", "PATH");
		o.optopt(  "",  "skip-lock", "Skip the check while this file exists, such as when the editor is playing", "PATH");
		o.parsing_style(getopts::ParsingStyle::FloatingFrees);
		opts = o;

		match opts.parse(&args[1..]) {
			Ok(m)  => { m }
			Err(e) => { eprintln!("Unable to parse options: {}", e); return ExitCode::FAILURE }
		}
	};

	if parsed_options.opt_present("h") {
		eprintln!("{}", opts.usage("Usage: pkgcheck [options] [check]"));
		return ExitCode::SUCCESS;
	}

	let level = if parsed_options.opt_present("v") { "debug" } else { "info" };
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

	match parsed_options.free.first().map(String::as_str) {
		None | Some("check") => {},
		Some(command) => {
			log::error!("Unknown command \"{}\"", command);
			return ExitCode::FAILURE;
		},
	}

	let config = match parsed_options.opt_str("c") {
		Some(path) => match pkgcheck::Config::load_from_file(&path) {
			Ok(config) => config,
			Err(e) => {
				log::error!("Failed to read config file {}: {}", path, e);
				return ExitCode::FAILURE;
			},
		},
		None => pkgcheck::Config::load_from_disk().unwrap_or_else(|e| {
			log::warn!("Failed to read config file: {}", e);
			log::warn!("Using default config.");
			pkgcheck::Config::default()
		}),
	};

	let host = match (parsed_options.opt_str("wait-lock"), parsed_options.opt_str("skip-lock")) {
		(None, None) => None,
		(wait, skip) => {
			// An empty path never exists so the host is never busy.
			let host = LockFileActivity::new(wait.unwrap_or_default());
			Some(match skip {
				Some(skip) => host.with_skip_file(skip),
				None => host,
			})
		},
	};

	match check_packages(config, parsed_options.opt_present("f"), host).await {
		Ok(Some(report)) => {
			print_report(&report);
			if report.failures().next().is_some() { ExitCode::FAILURE } else { ExitCode::SUCCESS }
		},
		Ok(None) => {
			println!("Package check skipped, use --force to check again if it already ran.");
			ExitCode::SUCCESS
		},
		Err(e) => {
			log::error!("Package check failed: {}", e);
			ExitCode::FAILURE
		},
	}
}

async fn check_packages(config: pkgcheck::Config, force: bool, host: Option<LockFileActivity>) -> Result<Option<WalkReport>, Error> {
	let registry = ManifestRegistry::from_config(&config)?;
	log::debug!("Using manifest {}", registry.manifest_path().display());

	let checker = PackageChecker::new(config);
	let report = match host {
		Some(host) => checker.check_packages_when_idle(registry, &host, force).await?,
		None => checker.check_packages_when_idle(registry, &NeverBusy, force).await?,
	};
	Ok(report)
}

fn print_report(report: &WalkReport) {
	for (spec, outcome) in &report.items {
		match outcome {
			ItemOutcome::Satisfied => println!("\t{} up to date", spec),
			ItemOutcome::Installed => println!("\t{} installed", spec),
			ItemOutcome::InstallFailed(e) => println!("\t{} install failed: {}", spec, e),
			ItemOutcome::LookupFailed(e) => println!("\t{} lookup failed: {}", spec, e),
		}
	}
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("pkgcheck error: {0}")]
	PkgCheck(#[from] pkgcheck::Error),
}
