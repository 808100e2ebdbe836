//! Service-specific tests
//!
//! Each service has its own test file with dedicated helpers.

#[cfg(test)]
mod log_files;
#[cfg(test)]
mod scratch;

// Common test utilities for services
#[cfg(test)]
pub mod common {
    use std::time::Duration;

    use crate::services::readiness::ReadinessPolicy;
    use crate::traits::LaunchSpec;
    use shared::ServiceRole;

    /// Readiness policy short enough for tests
    pub fn quick_policy() -> ReadinessPolicy {
        ReadinessPolicy {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
            deadline: Duration::from_secs(2),
        }
    }

    /// A long-sleeping child standing in for a service
    pub fn sleeper(role: ServiceRole) -> LaunchSpec {
        LaunchSpec::new(role, "sleep").arg("30")
    }
}
