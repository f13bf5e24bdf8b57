use std::time::Duration;

use color_eyre::{eyre::eyre, Report};
use tracing::{debug, info};

use crate::{trap::Trap, TracingLogger, TrapConfig};

/// Cleanup duration used by `serve` when none is given.
pub const DEFAULT_CLEANUP: Duration = Duration::from_millis(500);

const HEARTBEAT: Duration = Duration::from_secs(5);

#[derive(Debug, PartialEq, Eq)]
pub enum CommandSwitch {
    /// run until signalled, with a cleanup that takes the given time
    Serve(Duration),
    /// run until signalled, with a cleanup that never returns
    Hang,
}

impl CommandSwitch {
    pub fn parse_from_args<A>(args: A) -> Result<CommandSwitch, Report>
    where
        A: IntoIterator<Item = String>,
    {
        let args = args.into_iter().skip(1).collect::<Vec<String>>();
        let Some(mode) = args.first() else {
            return Err(eyre!("missing mode, expected `serve [cleanup-millis]` or `hang`"));
        };

        match (mode.to_lowercase().as_str(), &args[1..]) {
            ("serve", []) => Ok(CommandSwitch::Serve(DEFAULT_CLEANUP)),
            ("serve", [millis]) => {
                let millis = millis
                    .parse::<u64>()
                    .map_err(|err| eyre!("invalid cleanup duration {millis:?}: {err}"))?;
                Ok(CommandSwitch::Serve(Duration::from_millis(millis)))
            }
            ("hang", []) => Ok(CommandSwitch::Hang),
            ("serve" | "hang", _) => Err(eyre!("too many arguments for mode {mode}")),
            (unsupported, _) => Err(eyre!("invalid or unsupported mode: {unsupported}")),
        }
    }

    /// Install the signal trap and idle until it ends the process.
    pub async fn run(self) -> Result<(), Report> {
        let config = TrapConfig::from_env();
        let trap = match self {
            CommandSwitch::Serve(duration) => Trap::new(
                move || {
                    info!(?duration, "cleanup started");
                    std::thread::sleep(duration);
                    info!("cleanup finished");
                },
                TracingLogger,
            ),
            CommandSwitch::Hang => Trap::new(
                || {
                    info!("cleanup started");
                    loop {
                        std::thread::park();
                    }
                },
                TracingLogger,
            ),
        };
        trap.with_config(config).install()?;

        info!(pid = std::process::id(), "daemon running");
        let mut heartbeat = tokio::time::interval(HEARTBEAT);
        loop {
            heartbeat.tick().await;
            debug!("daemon alive");
        }
    }
}
