//! Test fixtures and data for test runner tests
//!
//! A throwaway repository tree with the service config files the strategies
//! look for, plus the standard values used across the suites.

use serde_json::json;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Standard test data and fixtures
pub struct TestFixtures;

impl TestFixtures {
    /// Ports written into the two default unit-test server configs
    pub const SERVER_PORT_1: u16 = 55557;
    pub const SERVER_PORT_2: u16 = 55558;

    pub const MINIO_USER: &'static str = "admin";
    pub const MINIO_PASSWORD: &'static str = "minio-secret";
    pub const NEO4J_USER: &'static str = "neo4j";
    pub const NEO4J_PASSWORD: &'static str = "neo4j-secret";

    /// Default googletest filter for the non-remote unit tests
    pub const UT_FILTER: &'static str = "-RemoteConnectionTest.*:Neo4jBackendTest.*:OpsIOCoordinatorTest.*:Neo4JE2ETest.*";

    /// A server config with a storage root and a trailing comment
    pub fn server_config(port: u16, db_root: &str) -> String {
        format!(
            "{{\n  \"port\": {port}, // listening port\n  \"db_root_path\": \"{db_root}\",\n  \"more-info\": \"keep me\"\n}}\n"
        )
    }
}

/// Temporary repository laid out like the real one
///
/// `root/tests` is the directory the runner is started from.
pub struct RepoFixture {
    dir: TempDir,
}

impl RepoFixture {
    /// Repository with the two default unit-test server configs
    pub fn new() -> Self {
        let fixture = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        std::fs::create_dir_all(fixture.tests_dir()).unwrap();
        fixture.write(
            "tests/unit_tests/config-tests.json",
            &TestFixtures::server_config(TestFixtures::SERVER_PORT_1, "tests_db"),
        );
        fixture.write(
            "tests/unit_tests/config-client-tests.json",
            &TestFixtures::server_config(TestFixtures::SERVER_PORT_2, "/var/lib/client_db"),
        );
        fixture
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn tests_dir(&self) -> PathBuf {
        self.root().join("tests")
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.tests_dir().join("tests_output_dir")
    }

    /// Write a file relative to the repository root
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Write a runner JSON config into the tests dir
    pub fn write_runner_config(&self, name: &str, value: serde_json::Value) -> PathBuf {
        self.write(&format!("tests/{name}"), &value.to_string())
    }

    /// Python client dir and the default interpreted-suite server configs
    pub fn with_python_suite(self, config_names: [&str; 2]) -> Self {
        std::fs::create_dir_all(self.root().join("client/python")).unwrap();
        for (name, port) in config_names.iter().zip([TestFixtures::SERVER_PORT_1, TestFixtures::SERVER_PORT_2]) {
            self.write(&format!("tests/python/{name}"), &TestFixtures::server_config(port, "python_db"));
        }
        self
    }

    /// Runner JSON config selecting the graph backend suite
    pub fn graph_backend_config(&self) -> PathBuf {
        self.write_runner_config(
            "neo.json",
            json!({
                "type_of_test": "neo",
                "test_name": "Neo4jBackendTest.*",
                "neo4j_username": TestFixtures::NEO4J_USER,
                "neo4j_password": TestFixtures::NEO4J_PASSWORD,
            }),
        )
    }
}
