#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use govlint::{AuthConfig, AuthConfigStore, AuthEntry, AuthenticatedFetchResolver, EnvProvider};

/// Test fixture paths
pub struct TestFixtures {
    pub fixtures_dir: PathBuf,
}

impl TestFixtures {
    pub fn new() -> Self {
        let fixtures_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures");

        Self { fixtures_dir }
    }

    pub fn valid(&self) -> PathBuf {
        self.fixtures_dir.join("valid.yaml")
    }

    pub fn missing_paths(&self) -> PathBuf {
        self.fixtures_dir.join("missing-paths.yaml")
    }

    pub fn with_warnings(&self) -> PathBuf {
        self.fixtures_dir.join("with-warnings.yaml")
    }

    pub fn read(&self, path: &Path) -> String {
        std::fs::read_to_string(path).unwrap()
    }
}

/// Environment backed by a map
#[derive(Default)]
pub struct MapEnv(pub HashMap<String, String>);

impl MapEnv {
    pub fn with(key: &str, value: &str) -> Self {
        Self(HashMap::from([(key.to_string(), value.to_string())]))
    }
}

impl EnvProvider for MapEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

/// Auth table fixed at construction
pub struct StaticAuthStore(pub Vec<AuthEntry>);

impl AuthConfigStore for StaticAuthStore {
    fn load(&self) -> AuthConfig {
        AuthConfig::new(self.0.clone())
    }
}

pub fn auth_entry(pattern: &str, token: &str) -> AuthEntry {
    AuthEntry {
        url_pattern: pattern.to_string(),
        token: token.to_string(),
        auth_type: "Bearer".to_string(),
        headers: Default::default(),
    }
}

/// Resolver over plain-http mock servers with the given auth table
pub fn resolver(entries: Vec<AuthEntry>, env: MapEnv) -> AuthenticatedFetchResolver {
    AuthenticatedFetchResolver::new(Arc::new(StaticAuthStore(entries)), Arc::new(env))
        .allow_insecure(true)
}
