//! Escalating shutdown trap for long-running daemons.
//!
//! ```no_run
//! use trapdoor::{trap, TracingLogger};
//!
//! #[tokio::main]
//! async fn main() -> color_eyre::Result<()> {
//!     trap(|| { /* flush buffers, close sockets */ }, TracingLogger)?;
//!     std::future::pending::<()>().await;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod telemetry;
pub mod trap;

pub use config::TrapConfig;
pub use trap::{
    dispatch::{signal_exit_code, Disposition, Dispatcher, CLEAN_EXIT},
    signals::Signal,
    trap, Logger, ProcessExit, Terminate, TracingLogger, Trap,
};
