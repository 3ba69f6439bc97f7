use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};
use pi_reports::config::{self, Command};
use pi_reports::SnapshotService;
use simple_logger::SimpleLogger;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let cli = config::Cli::parse();

    let level: LevelFilter = cli
        .log_level
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid log level: {}", cli.log_level))?;
    SimpleLogger::new()
        .with_level(level)
        .env()
        .init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    // Load configuration
    let config = config::load_config(&cli)?;
    info!("Configuration loaded successfully");

    let service = SnapshotService::from_config(&config);

    match cli.command {
        Command::Probes => {
            for name in service.list_probe_names() {
                println!("{}", name);
            }
        }

        Command::Speedlog { limit, json, csv } => {
            let limit = limit.unwrap_or(config.history_limit);
            if csv {
                println!("{}", service.speed_history_csv(limit).await?);
                return Ok(());
            }

            let history = service
                .recent_speed_history(limit)
                .await
                .context("Failed to load speed history")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&history)?);
            } else {
                println!("{:<32} {:>10} {:>10}", "time", "download", "upload");
                for record in &history {
                    println!(
                        "{:<32} {:>10.2} {:>10.2}",
                        record.timestamp, record.download_mbps, record.upload_mbps
                    );
                }
            }
        }

        Command::Probe { name } => {
            let result = service
                .run_probe(&name)
                .await
                .with_context(|| format!("Unknown probe: {}", name))?;

            info!("Probe {} finished in {:?}", name, result.elapsed);
            print!("{}", result.output);
            if !result.succeeded {
                anyhow::bail!("Probe {} failed", name);
            }
        }

        Command::Bundle { names, out_dir } => {
            let archive = service.run_snapshot(&names).await?;
            let entries = archive.entries().len();
            let saved = archive
                .persist_to(&out_dir)
                .await
                .with_context(|| format!("Failed to save archive to {:?}", out_dir))?;

            info!("Saved {} with {} entries", saved.display(), entries);
            println!("{}", saved.display());
        }

        Command::System => {
            let summary = service.system_summary().await;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::Stats => {
            let stats = service
                .pihole_stats()
                .await
                .context("Failed to fetch Pi-hole stats")?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }

        Command::Log => {
            print!("{}", service.raw_log().await?);
        }
    }

    Ok(())
}
