//! Per-signal escalation policy and exit-code selection.

use std::{
    num::NonZeroU32,
    sync::{Arc, Mutex},
};

use super::{
    counter::EscalationCounter,
    signals::{Signal, SignalEvents},
    Logger, Terminate, TrapConfig,
};

/// Exit code used after the cleanup handler returned.
pub const CLEAN_EXIT: i32 = 0;

/// Base of the conventional "killed by signal N" exit code.
pub const SIGNAL_EXIT_BASE: i32 = 128;

/// Exit code for a process terminated because of `signal`.
pub fn signal_exit_code(signal: Signal) -> i32 {
    SIGNAL_EXIT_BASE + signal.number()
}

/// Caller-supplied cleanup routine, run at most once.
pub type CleanupHandler = Box<dyn FnOnce() + Send + 'static>;

/// What a single observed signal should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// First signal: run cleanup, then exit cleanly.
    Cleanup,
    /// Shutdown already underway; leave it undisturbed.
    Ignore { seen: u32 },
    /// Too many signals: exit now, bypassing cleanup.
    Force,
}

struct Inner {
    counter: EscalationCounter,
    tolerated_signals: NonZeroU32,
    cleanup: Mutex<Option<CleanupHandler>>,
    logger: Arc<dyn Logger>,
    terminator: Arc<dyn Terminate>,
}

/// Applies the escalation policy to every signal event.
///
/// Cheap to clone; clones share the counter and the cleanup handler.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    pub(crate) fn new(
        config: TrapConfig,
        cleanup: CleanupHandler,
        logger: Arc<dyn Logger>,
        terminator: Arc<dyn Terminate>,
    ) -> Dispatcher {
        Dispatcher {
            inner: Arc::new(Inner {
                counter: EscalationCounter::new(),
                tolerated_signals: config.tolerated_signals,
                cleanup: Mutex::new(Some(cleanup)),
                logger,
                terminator,
            }),
        }
    }

    /// Returns the counter shared by every task spawned from this dispatcher.
    pub fn counter(&self) -> &EscalationCounter {
        &self.inner.counter
    }

    /// Read every event from `events`, handling each one in its own task.
    ///
    /// Never waits for a spawned task, so a stuck cleanup cannot stop later
    /// signals from being drained.
    pub async fn run(self, mut events: SignalEvents) {
        while let Some(signal) = events.recv().await {
            let dispatcher = self.clone();
            tokio::spawn(async move { dispatcher.handle(signal).await });
        }
        tracing::debug!("signal event source closed");
    }

    /// Record one observed signal on the counter and classify it.
    ///
    /// The tolerance check happens before the increment, so with the default
    /// of three the second and third signals are ignored and the fourth forces
    /// the exit.
    pub fn decide(&self) -> Disposition {
        let counter = &self.inner.counter;
        if counter.load() < self.inner.tolerated_signals.get() {
            match counter.increment_and_load() {
                1 => Disposition::Cleanup,
                seen => Disposition::Ignore { seen },
            }
        } else {
            Disposition::Force
        }
    }

    /// Apply the escalation policy to a single signal.
    ///
    /// With the production terminator this does not return on the cleanup
    /// and forced paths.
    pub async fn handle(&self, signal: Signal) {
        self.inner
            .logger
            .info(&format!("Processing signal '{signal}'"));

        match self.decide() {
            Disposition::Cleanup => self.clean_exit(signal).await,
            // Shutdown already underway.
            Disposition::Ignore { .. } => {}
            Disposition::Force => {
                self.inner.logger.info(&format!(
                    "Forcing shutdown without cleanup; {} interrupts received",
                    self.inner.tolerated_signals
                ));
                self.inner.terminator.terminate(signal_exit_code(signal));
            }
        }
    }

    async fn clean_exit(&self, signal: Signal) {
        let cleanup = match self.inner.cleanup.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(cleanup) = cleanup else {
            tracing::error!(%signal, "cleanup handler already taken");
            return;
        };

        tracing::debug!(%signal, "running cleanup handler");
        match tokio::task::spawn_blocking(cleanup).await {
            Ok(()) => self.inner.terminator.terminate(CLEAN_EXIT),
            Err(err) => {
                tracing::error!(%signal, "cleanup handler failed: {err}");
                self.inner.terminator.terminate(signal_exit_code(signal));
            }
        }
    }
}
