//! Bounded backoff polling for service readiness

use std::time::Duration;
use tokio::net::TcpStream;
use tokio::process::Child;
use tokio::time::{sleep, timeout, Instant};

use crate::error::{RunnerError, RunnerResult};
use crate::traits::Readiness;
use shared::{process_debug, ServiceRole};

const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Polling schedule for one readiness wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub deadline: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            deadline: Duration::from_secs(crate::config::defaults::DEFAULT_STARTUP_TIMEOUT_SECS),
        }
    }
}

impl ReadinessPolicy {
    pub fn with_deadline(deadline: Duration) -> Self {
        Self { deadline, ..Self::default() }
    }

    /// Delays between attempts: doubling from `initial_delay`, capped at `max_delay`
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        std::iter::successors(Some(self.initial_delay), move |prev| {
            Some((*prev * 2).min(self.max_delay))
        })
    }
}

/// Performs one readiness check
#[derive(Debug, Clone)]
pub struct ReadinessProbe {
    client: reqwest::Client,
}

impl Default for ReadinessProbe {
    fn default() -> Self {
        // Health endpoints are local; a proxy from the environment must not intercept them
        let client = reqwest::Client::builder().no_proxy().build().unwrap_or_default();
        Self { client }
    }
}

impl ReadinessProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn check(&self, readiness: &Readiness) -> bool {
        match readiness {
            Readiness::Immediate => true,
            Readiness::Tcp { port } => matches!(
                timeout(PROBE_TIMEOUT, TcpStream::connect(("127.0.0.1", *port))).await,
                Ok(Ok(_))
            ),
            Readiness::Http { url } => match self.client.get(url).timeout(PROBE_TIMEOUT).send().await {
                Ok(response) => response.status().is_success(),
                Err(_) => false,
            },
        }
    }
}

/// Poll until `readiness` holds, the child exits, or the deadline passes
///
/// Returns how long the service took to come up.
pub async fn wait_until_ready(
    role: ServiceRole,
    child: &mut Child,
    readiness: &Readiness,
    probe: &ReadinessProbe,
    policy: &ReadinessPolicy,
) -> RunnerResult<Duration> {
    if *readiness == Readiness::Immediate {
        return Ok(Duration::ZERO);
    }
    let started = Instant::now();
    let deadline = started + policy.deadline;
    let mut delays = policy.delays();

    loop {
        if let Some(status) = child
            .try_wait()
            .map_err(|e| RunnerError::process(role, format!("cannot poll process: {e}")))?
        {
            return Err(RunnerError::process(role, format!("exited during startup with {status}")));
        }
        if probe.check(readiness).await {
            let elapsed = started.elapsed();
            process_debug!(role, "Ready after {:?}", elapsed);
            return Ok(elapsed);
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(RunnerError::process(
                role,
                format!("not ready after {:?} ({readiness:?})", policy.deadline),
            ));
        }
        let delay = delays.next().unwrap_or(policy.max_delay);
        sleep(delay.min(deadline - now)).await;
    }
}
