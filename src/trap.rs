//! Signal trap for long-running daemons.
//!
//! - The first SIGINT or SIGTERM runs the cleanup handler, then exits with `0`.
//! - The next signals (two, by default) are ignored so the cleanup can finish.
//! - Any later signal skips cleanup and exits immediately with `128 + signo`,
//!   which allows force-quitting a stuck daemon.

use std::sync::Arc;

use color_eyre::Report;

pub mod counter;
pub mod dispatch;
pub mod signals;

pub use crate::config::TrapConfig;
use dispatch::{CleanupHandler, Dispatcher};

/// Sink for the trap's informational messages.
pub trait Logger: Send + Sync + 'static {
    fn info(&self, message: &str);
}

/// [Logger] that forwards to `tracing` at INFO level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }
}

/// Capability to end the process with a given exit code.
///
/// Implementations used in production must not return.
pub trait Terminate: Send + Sync + 'static {
    fn terminate(&self, code: i32);
}

/// [Terminate] backed by [std::process::exit].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExit;

impl Terminate for ProcessExit {
    fn terminate(&self, code: i32) {
        tracing::debug!(code, "exiting process");
        std::process::exit(code)
    }
}

/// Builder for a signal trap.
pub struct Trap {
    cleanup: CleanupHandler,
    logger: Arc<dyn Logger>,
    terminator: Arc<dyn Terminate>,
    config: TrapConfig,
}

impl Trap {
    /// Construct a new [Trap] that exits the process through [ProcessExit].
    pub fn new<F, L>(cleanup: F, logger: L) -> Trap
    where
        F: FnOnce() + Send + 'static,
        L: Logger,
    {
        Trap {
            cleanup: Box::new(cleanup),
            logger: Arc::new(logger),
            terminator: Arc::new(ProcessExit),
            config: TrapConfig::default(),
        }
    }

    /// Replace the process-exit capability.
    pub fn with_terminator<T: Terminate>(mut self, terminator: T) -> Trap {
        self.terminator = Arc::new(terminator);
        self
    }

    pub fn with_config(mut self, config: TrapConfig) -> Trap {
        self.config = config;
        self
    }

    /// Build the dispatcher without subscribing to any OS signal.
    pub fn dispatcher(self) -> Dispatcher {
        Dispatcher::new(self.config, self.cleanup, self.logger, self.terminator)
    }

    /// Subscribe to SIGINT and SIGTERM and start handling them in the background.
    ///
    /// Returns as soon as the subscription is in place. Fails when called
    /// outside a Tokio runtime or when the OS refuses the registration.
    pub fn install(self) -> Result<(), Report> {
        let tolerated_signals = self.config.tolerated_signals.get();
        let (slot, events) = signals::slot();
        signals::spawn_signal_listener(slot)?;
        tokio::spawn(self.dispatcher().run(events));

        tracing::info!(tolerated_signals, "signal trap installed");
        Ok(())
    }
}

/// Install a signal trap with the default configuration.
///
/// See [Trap::install].
pub fn trap<F, L>(cleanup: F, logger: L) -> Result<(), Report>
where
    F: FnOnce() + Send + 'static,
    L: Logger,
{
    Trap::new(cleanup, logger).install()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_outside_runtime_is_an_error() {
        let err = trap(|| {}, TracingLogger).unwrap_err();
        assert!(err.to_string().contains("Tokio runtime"));
    }

    #[tokio::test]
    async fn install_returns_immediately_inside_runtime() {
        let cleanup_ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Arc::clone(&cleanup_ran);

        Trap::new(move || flag.store(true, std::sync::atomic::Ordering::SeqCst), TracingLogger)
            .install()
            .unwrap();

        assert!(!cleanup_ran.load(std::sync::atomic::Ordering::SeqCst));
    }
}
