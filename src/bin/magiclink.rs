use anyhow::Result;
use magiclink::cli::{self, telemetry};

// Main function
#[tokio::main]
async fn main() -> Result<()> {
    let action = cli::start()?;

    let result = action.execute().await;

    // Flush buffered spans before exit
    telemetry::shutdown_tracer();

    result
}
