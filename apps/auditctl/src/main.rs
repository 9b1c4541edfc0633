use std::path::PathBuf;

use anyhow::{Context, Result};
use audit_service::{AuditService, AuditServiceBuilder};
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "auditctl")]
#[command(about = "Inspect or reset a persisted audit trail log")]
struct Cli {
    #[arg(long, env = "AUDIT_LOG_FILE", default_value = "audit-logs.json")]
    log_file: PathBuf,
    /// Events beyond this many are dropped, oldest first, when the log is loaded.
    #[arg(long, env = "AUDIT_CAPACITY", default_value_t = 10_000)]
    capacity: usize,
    #[arg(long = "top-pages", env = "AUDIT_TOP_PAGES", default_value_t = 10)]
    top_pages: usize,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Totals, unique visitors and counts by event type.
    Summary,
    /// Extended statistics: devices, top pages, recent events, time range.
    Stats,
    /// Print every retained event, oldest first.
    Export,
    /// Remove every event from the log.
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let service = AuditServiceBuilder::new()
        .capacity(cli.capacity)
        .log_file(&cli.log_file)
        .top_pages_limit(cli.top_pages)
        .build()
        .await
        .with_context(|| format!("failed opening {}", cli.log_file.display()))?;

    let output = run(&service, &cli.command).await?;
    println!("{output}");
    Ok(())
}

async fn run(service: &AuditService, command: &Command) -> Result<String> {
    let rendered = match command {
        Command::Summary => serde_json::to_string_pretty(&service.summary().await)?,
        Command::Stats => serde_json::to_string_pretty(&service.stats().await)?,
        Command::Export => serde_json::to_string_pretty(&service.export().await)?,
        Command::Clear => {
            let dropped = service.count().await;
            service.clear().await?;
            info!(dropped, "log cleared");
            serde_json::to_string_pretty(&serde_json::json!({
                "success": true,
                "cleared": dropped,
            }))?
        }
    };
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    use anyhow::Result;
    use audit_service::AuditServiceBuilder;
    use clap::Parser;
    use serde_json::Value;

    use super::{Cli, Command, run};

    fn unique_test_root(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("{name}-{nanos}"))
    }

    #[test]
    fn parses_subcommand_and_log_file() {
        let cli = Cli::try_parse_from(["auditctl", "--log-file", "logs.json", "stats"])
            .expect("flags parse");
        assert_eq!(cli.log_file, PathBuf::from("logs.json"));
        assert!(matches!(cli.command, Command::Stats));
    }

    #[tokio::test]
    async fn summary_and_clear_operate_on_the_log_file() -> Result<()> {
        let root = unique_test_root("auditctl");
        let path = root.join("audit-logs.json");
        let service = AuditServiceBuilder::new().log_file(&path).build().await?;
        service
            .record(
                br#"{"eventType":"page_view","visitorId":"v1"}"#,
                &Default::default(),
            )
            .await?;

        let summary: Value = serde_json::from_str(&run(&service, &Command::Summary).await?)?;
        assert_eq!(summary["totalEvents"], 1);

        let cleared: Value = serde_json::from_str(&run(&service, &Command::Clear).await?)?;
        assert_eq!(cleared["cleared"], 1);

        let reopened = AuditServiceBuilder::new().log_file(&path).build().await?;
        let exported: Value = serde_json::from_str(&run(&reopened, &Command::Export).await?)?;
        assert_eq!(exported, Value::Array(Vec::new()));

        let _ = tokio::fs::remove_dir_all(root).await;
        Ok(())
    }
}
