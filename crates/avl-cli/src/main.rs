//! 🚀 avl: the front door. Loads config, gathers locators, runs the pipeline,
//! prints a table, picks an exit code. The real work happens in the `avl` crate.
//!
//! 🎬 *[narrator voice]* "It all started with an S3 event and a dream..." 🦆

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use avl::{ObjectLocator, UploadEvent};

/// 🪣 Lift Avro container files out of a bucket and into an OpenSearch index.
#[derive(Debug, Parser)]
#[command(name = "avl", version, about)]
struct Cli {
    /// TOML config file, layered on top of OPENSEARCH_* and AVL_* env vars
    #[arg(long)]
    config: Option<PathBuf>,

    /// S3 event-notification JSON file; may be repeated
    #[arg(long = "event", value_name = "S3_EVENT_JSON")]
    events: Vec<PathBuf>,

    /// An object to process directly, as <bucket>/<key>; may be repeated
    #[arg(long = "object", value_name = "BUCKET/KEY")]
    objects: Vec<ObjectLocator>,

    /// Append payloads to this NDJSON file instead of POSTing them
    #[arg(long, value_name = "FILE")]
    dry_run: Option<PathBuf>,
}

/// 📬 Events first, in the order given, then the loose `--object` flags.
fn collect_locators(cli: &Cli) -> Result<Vec<ObjectLocator>> {
    let mut the_locators = Vec::new();
    for event_path in &cli.events {
        let the_raw = std::fs::read_to_string(event_path).context(format!(
            "💀 Couldn't read the event file '{}'. Relative paths are relative to where you are, not where you wish you were.",
            event_path.display()
        ))?;
        let the_event = UploadEvent::from_json(&the_raw).context(format!(
            "💀 '{}' is not an S3 event notification we recognize",
            event_path.display()
        ))?;
        the_locators.extend(the_event.locators());
    }
    the_locators.extend(cli.objects.iter().cloned());
    Ok(the_locators)
}

async fn run(cli: Cli) -> Result<bool> {
    let app_config = avl::load_config(cli.config.as_deref())
        .context("💀 In avl, main, we couldn't load the config. Take a look at the file and the env vars.")?;
    let the_locators = collect_locators(&cli)?;
    if the_locators.is_empty() {
        anyhow::bail!("💀 Nothing to do: pass at least one --event or --object");
    }

    let the_report = avl::run(app_config, the_locators, cli.dry_run).await?;
    println!("{}", the_report.render_table());
    if the_report.cluster_unreachable() {
        error!(
            "🔧 hint: the cluster isn't reachable. Check OPENSEARCH_URL, and that something is listening there."
        );
    }
    Ok(!the_report.has_failures())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => Ok(()),
        // -- the table already said what went wrong
        Ok(false) => std::process::exit(1),
        Err(err) => {
            error!("💀 error: {}", err);
            // -- 🧅 peel the onion of sadness, one layer at a time
            for cause in err.chain().skip(1) {
                error!("⚠️  cause: {}", cause);
            }
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_flags_repeat_and_objects_parse() {
        let the_cli = Cli::try_parse_from([
            "avl",
            "--object",
            "catalog/daily/a.avro",
            "--object",
            "catalog/b.avro",
            "--dry-run",
            "out.ndjson",
        ])
        .expect("💀 flags should parse");
        assert_eq!(
            the_cli.objects,
            vec![
                ObjectLocator::new("catalog", "daily/a.avro"),
                ObjectLocator::new("catalog", "b.avro"),
            ]
        );
        assert_eq!(the_cli.dry_run, Some(PathBuf::from("out.ndjson")));
        assert!(the_cli.config.is_none());
    }

    #[test]
    fn the_one_where_a_slashless_object_is_turned_away_at_the_door() {
        assert!(Cli::try_parse_from(["avl", "--object", "no-slash-here"]).is_err());
    }

    #[test]
    fn the_one_where_events_come_before_loose_objects() -> Result<()> {
        let the_dir = tempfile::tempdir()?;
        let the_event_path = the_dir.path().join("event.json");
        std::fs::write(
            &the_event_path,
            r#"{"Records":[{"s3":{"bucket":{"name":"drops"},"object":{"key":"from+event.avro"}}}]}"#,
        )?;

        let the_cli = Cli::try_parse_from([
            "avl",
            "--object",
            "drops/loose.avro",
            "--event",
            the_event_path.to_str().expect("💀 temp path is not utf-8"),
        ])?;
        assert_eq!(
            collect_locators(&the_cli)?,
            vec![
                ObjectLocator::new("drops", "from event.avro"),
                ObjectLocator::new("drops", "loose.avro"),
            ]
        );
        Ok(())
    }
}
