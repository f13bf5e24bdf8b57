use color_eyre::Report;

use trapdoor::{cli::CommandSwitch, telemetry};

#[tokio::main]
async fn main() -> Result<(), Report> {
    color_eyre::install()?;
    telemetry::attach_tracing_logger()?;

    // Parse the daemon mode (serve/hang) and its arguments from the user
    let command = CommandSwitch::parse_from_args(std::env::args())?;
    command.run().await
}
