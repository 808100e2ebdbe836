//! Termination signal handling

use nix::sys::signal::Signal;
use tokio::signal::unix::{signal, Signal as Stream, SignalKind};

use crate::error::RunnerResult;
use shared::{process_info, process_warn, ServiceRole};

/// Listens for the signals that end a run
///
/// Interrupt, terminate and abort end the run. Hang-up and user-defined
/// signal 1 are reported and otherwise ignored.
pub struct SignalListener {
    interrupt: Stream,
    terminate: Stream,
    abort: Stream,
    hangup: Stream,
    user_defined: Stream,
}

impl SignalListener {
    /// Register the handlers; must run inside a tokio runtime
    pub fn install() -> RunnerResult<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            abort: signal(SignalKind::from_raw(Signal::SIGABRT as i32))?,
            hangup: signal(SignalKind::hangup())?,
            user_defined: signal(SignalKind::user_defined1())?,
        })
    }

    /// Wait for the next signal that should end the run and return its name
    pub async fn next_terminating(&mut self) -> &'static str {
        loop {
            tokio::select! {
                _ = self.interrupt.recv() => return Signal::SIGINT.as_str(),
                _ = self.terminate.recv() => return Signal::SIGTERM.as_str(),
                _ = self.abort.recv() => return Signal::SIGABRT.as_str(),
                _ = self.hangup.recv() => {
                    process_warn!(ServiceRole::Runner, "Received {}, continuing", Signal::SIGHUP);
                }
                _ = self.user_defined.recv() => {
                    process_info!(ServiceRole::Runner, "Received {}, continuing", Signal::SIGUSR1);
                }
            }
        }
    }
}
