//! OS-specific listener that turns interrupt/terminate delivery into [Signal] events.

use std::fmt;

use color_eyre::{eyre::eyre, Report};
use tokio::sync::mpsc::{self, error::TrySendError};

/// One received termination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// SIGINT, usually Ctrl-C in a terminal.
    Interrupt,
    /// SIGTERM, the default `kill` signal.
    Terminate,
}

impl Signal {
    /// Returns the OS signal number, as used in `128 + n` exit codes.
    #[cfg(unix)]
    pub fn number(self) -> i32 {
        use tokio::signal::unix::SignalKind;

        match self {
            Signal::Interrupt => SignalKind::interrupt().as_raw_value(),
            Signal::Terminate => SignalKind::terminate().as_raw_value(),
        }
    }

    /// Returns the conventional signal number, as used in `128 + n` exit codes.
    #[cfg(not(unix))]
    pub fn number(self) -> i32 {
        match self {
            Signal::Interrupt => 2,
            Signal::Terminate => 15,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Interrupt => f.write_str("SIGINT"),
            Signal::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Receiving half of the delivery slot.
pub type SignalEvents = mpsc::Receiver<Signal>;

/// Producer side of a delivery slot holding at most one unread [Signal].
#[derive(Debug, Clone)]
pub struct SignalSlot {
    tx: mpsc::Sender<Signal>,
}

/// Create an empty delivery slot of capacity one.
pub fn slot() -> (SignalSlot, SignalEvents) {
    let (tx, rx) = mpsc::channel(1);
    (SignalSlot { tx }, rx)
}

impl SignalSlot {
    /// Place `signal` in the slot without waiting.
    ///
    /// If the previous event has not been read out yet, the new occurrence is
    /// dropped. Returns whether the event was accepted.
    pub fn offer(&self, signal: Signal) -> bool {
        match self.tx.try_send(signal) {
            Ok(()) => true,
            Err(TrySendError::Full(dropped)) => {
                tracing::debug!(signal = %dropped, "signal slot occupied, dropping delivery");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Returns `true` once the consumer has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

fn ensure_runtime() -> Result<(), Report> {
    tokio::runtime::Handle::try_current()
        .map(|_| ())
        .map_err(|err| eyre!("signal trap requires a Tokio runtime: {err}"))
}

/// Subscribe to SIGINT and SIGTERM and feed every delivery into `slot`.
///
/// The subscription lives for the rest of the process; there is no way to
/// unregister it. Must be called from within a Tokio runtime.
#[cfg(unix)]
pub fn spawn_signal_listener(slot: SignalSlot) -> Result<(), Report> {
    use color_eyre::eyre::WrapErr;
    use tokio::signal::unix::{signal, SignalKind};

    ensure_runtime()?;
    let mut sigint =
        signal(SignalKind::interrupt()).wrap_err("failed to register SIGINT handler")?;
    let mut sigterm =
        signal(SignalKind::terminate()).wrap_err("failed to register SIGTERM handler")?;

    tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                Some(()) = sigint.recv() => Signal::Interrupt,
                Some(()) = sigterm.recv() => Signal::Terminate,
                else => break,
            };
            slot.offer(received);
            if slot.is_closed() {
                break;
            }
        }
        tracing::debug!("signal listener stopped");
    });

    Ok(())
}

/// Subscribe to Ctrl-C and feed every delivery into `slot` as [Signal::Interrupt].
#[cfg(not(unix))]
pub fn spawn_signal_listener(slot: SignalSlot) -> Result<(), Report> {
    ensure_runtime()?;
    tokio::spawn(async move {
        loop {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for Ctrl-C: {err}");
                return;
            }
            slot.offer(Signal::Interrupt);
            if slot.is_closed() {
                return;
            }
        }
    });

    Ok(())
}
