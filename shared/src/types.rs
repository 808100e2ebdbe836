//! Core shared types and identifiers

use std::fmt;

/// Which UDF dispatch service a process provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UdfKind {
    /// HTTP dispatcher for remote functions
    Remote,
    /// Local queue dispatcher for user-defined operations
    Local,
}

/// Role of a process taking part in a test run
///
/// Every managed child process and every log line emitted on its behalf
/// carries one of these roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceRole {
    /// The runner itself
    Runner,
    /// Object-store emulator
    ObjectStore,
    /// Object-store admin client (alias and bucket setup)
    ObjectStoreClient,
    /// Graph-database companion
    GraphDb,
    /// Server-under-test instance, numbered by its config file position
    ServerUnderTest(usize),
    /// UDF dispatch service
    UdfDispatcher(UdfKind),
    /// Dependency installation step
    DependencyInstall,
    /// TLS certificate preparation step
    CertPrep,
    /// Final test driver (compiled binary or interpreted suite)
    TestDriver,
}

impl ServiceRole {
    /// Long-running services stay up until teardown; the rest run once
    pub fn is_service(&self) -> bool {
        matches!(
            self,
            ServiceRole::ObjectStore
                | ServiceRole::GraphDb
                | ServiceRole::ServerUnderTest(_)
                | ServiceRole::UdfDispatcher(_)
        )
    }
}

impl fmt::Display for ServiceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceRole::Runner => write!(f, "runner"),
            ServiceRole::ObjectStore => write!(f, "object_store"),
            ServiceRole::ObjectStoreClient => write!(f, "object_store_client"),
            ServiceRole::GraphDb => write!(f, "graph_db"),
            ServiceRole::ServerUnderTest(index) => write!(f, "server_under_test_{index}"),
            ServiceRole::UdfDispatcher(UdfKind::Remote) => write!(f, "udf_remote"),
            ServiceRole::UdfDispatcher(UdfKind::Local) => write!(f, "udf_local"),
            ServiceRole::DependencyInstall => write!(f, "dependency_install"),
            ServiceRole::CertPrep => write!(f, "cert_prep"),
            ServiceRole::TestDriver => write!(f, "test_driver"),
        }
    }
}
