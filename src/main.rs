use anyhow::Context;
use clap::Parser;
use colored::*;
use rais_processor::cli::{Args, setup_logging};
use rais_processor::processor::JobProcessor;
use std::process;

fn main() {
    let args = Args::parse();
    setup_logging(&args);

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.block_on(async {
        tokio::select! {
            result = run(&args) => result,
            signal = tokio::signal::ctrl_c() => {
                eprintln!("\nReceived CTRL+C, shutting down...");
                match signal {
                    Ok(()) => Err(anyhow::anyhow!("Processing interrupted by user")),
                    Err(e) => Err(anyhow::Error::new(e).context("Failed to listen for CTRL+C")),
                }
            }
        }
    });

    match result {
        Ok(()) => process::exit(0),
        Err(error) => {
            eprintln!("{} {:#}", "Error:".bright_red().bold(), error);
            process::exit(1);
        }
    }
}

async fn run(args: &Args) -> anyhow::Result<()> {
    let config = args.to_config().context("Failed to build job configuration")?;

    let processor = JobProcessor::new(config)
        .context("Failed to initialize RAIS processor")?
        .with_progress(!args.quiet);

    let stats = processor.process().await.context("RAIS processing failed")?;

    println!(
        "\n{} {}",
        "Silver dataset written to".bright_green(),
        stats.output_path.display()
    );
    Ok(())
}
