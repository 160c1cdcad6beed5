use pkgcheck::registry::*;
use pkgcheck::SemanticVersion;

/// Polls a request on the runtime until it completes.
async fn wait<T>(mut request: Request<T>) -> RequestResult<T> {
	loop {
		match request.poll_status() {
			RequestStatus::Pending => tokio::time::sleep(std::time::Duration::from_millis(1)).await,
			RequestStatus::Complete(result) => return result,
		}
	}
}

fn v(s: &str) -> SemanticVersion { SemanticVersion::new(s).unwrap() }

#[tokio::test]
async fn manifest_search_installed() {
	let dir = pkgcheck_test_utils::project_dir().unwrap();
	let path = dir.path().join("manifest.json");
	pkgcheck_test_utils::write_manifest(&path, &[("com.unity.cinemachine", "2.2.9"), ("com.example.git", "https://example.com/repo.git")]).unwrap();

	let mut registry = ManifestRegistry::new(&path);
	assert_eq!(wait(registry.search("com.unity.cinemachine")).await, Ok(RegistryEntry::installed(v("2.2.9"))));
	assert_eq!(wait(registry.search("com.example.git")).await, Ok(RegistryEntry { found: true, installed_version: None }));
	assert_eq!(wait(registry.search("com.unity.missing")).await, Ok(RegistryEntry::not_found()));
}

#[tokio::test]
async fn manifest_search_missing_file_is_empty() {
	let dir = pkgcheck_test_utils::project_dir().unwrap();
	let mut registry = ManifestRegistry::new(dir.path().join("Packages/manifest.json"));
	assert_eq!(wait(registry.search("pkg")).await, Ok(RegistryEntry::not_found()));
}

#[tokio::test]
async fn manifest_search_invalid_name() {
	let dir = pkgcheck_test_utils::project_dir().unwrap();
	let mut registry = ManifestRegistry::new(dir.path().join("manifest.json"));
	assert_eq!(wait(registry.search("Not A Name")).await, Err(RegistryError::InvalidName("Not A Name".into())));
}

#[tokio::test]
async fn manifest_search_malformed_manifest() {
	let dir = pkgcheck_test_utils::project_dir().unwrap();
	let path = dir.path().join("manifest.json");
	std::fs::write(&path, "{ not json").unwrap();
	let mut registry = ManifestRegistry::new(&path);
	assert!(matches!(wait(registry.search("pkg")).await, Err(RegistryError::Manifest(_))));
}

#[tokio::test]
async fn manifest_install_writes_version_and_keeps_other_keys() {
	let dir = pkgcheck_test_utils::project_dir().unwrap();
	let path = dir.path().join("manifest.json");
	std::fs::write(&path, r#"{ "dependencies": { "a": "1.0.0" }, "scopedRegistries": [] }"#).unwrap();

	let mut registry = ManifestRegistry::new(&path);
	wait(registry.install("a", Some(&v("1.2.0")))).await.unwrap();
	wait(registry.install("b", Some(&v("0.3.0-preview.1")))).await.unwrap();

	let deps = pkgcheck_test_utils::read_manifest_dependencies(&path).unwrap();
	assert_eq!(deps.get("a").map(String::as_str), Some("1.2.0"));
	assert_eq!(deps.get("b").map(String::as_str), Some("0.3.0-preview.1"));

	let manifest: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
	assert!(manifest.get("scopedRegistries").is_some());
}

#[tokio::test]
async fn manifest_install_without_version_uses_catalog() {
	let dir = pkgcheck_test_utils::project_dir().unwrap();
	let path = dir.path().join("Packages").join("manifest.json");
	let mut registry = ManifestRegistry::new(&path).with_catalog([("pkg".to_string(), v("4.1.0"))]);

	wait(registry.install("pkg", None)).await.unwrap();
	assert_eq!(wait(registry.install("other", None)).await, Err(RegistryError::NotInCatalog("other".into())));

	let deps = pkgcheck_test_utils::read_manifest_dependencies(&path).unwrap();
	assert_eq!(deps.get("pkg").map(String::as_str), Some("4.1.0"));
	assert!(!deps.contains_key("other"));
}

#[tokio::test]
async fn manifest_registry_from_config() {
	let mut config = pkgcheck::Config::default();
	config.set_catalog([("pkg".to_string(), "1.0.0".to_string())].into_iter().collect());
	let registry = ManifestRegistry::from_config(&config).unwrap();
	assert_eq!(registry.catalog().get("pkg"), Some(&v("1.0.0")));

	config.set_catalog([("pkg".to_string(), "latest".to_string())].into_iter().collect());
	assert!(ManifestRegistry::from_config(&config).is_err());
}
