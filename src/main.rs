use clap::Parser;

use resume_screener_lib::core::commands::{run, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    resume_screener_lib::init_tracing(cli.verbose);
    run(cli).await
}
