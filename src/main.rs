//! RV Park Digest: binary entrypoint.
//! One run: collect, filter, categorize, synthesize, render, email.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rv_park_digest::config::{AiSettings, Settings};
use rv_park_digest::ingest::config::load_sources_default;
use rv_park_digest::ingest::http::HttpClient;
use rv_park_digest::ingest::{collect_all, CollectPlan, FetcherSet};
use rv_park_digest::notify::EmailSender;
use rv_park_digest::report::{assemble, render_html, subject};
use rv_park_digest::synthesis::build_summarizer;
use rv_park_digest::temporal::now_canonical;
use rv_park_digest::{Categorizer, RelevanceFilter};

/// Widest accepted `--days`.
const MAX_WINDOW_DAYS: i64 = 3650;

#[derive(Parser, Debug)]
#[command(
    name = "rv-park-digest",
    version,
    about = "Weekly US RV park / campground news digest"
)]
struct Cli {
    /// Recency window in days.
    #[arg(
        long,
        default_value_t = 7,
        value_parser = clap::value_parser!(i64).range(1..=MAX_WINDOW_DAYS)
    )]
    days: i64,
    /// Render the digest but do not send it.
    #[arg(long)]
    dry_run: bool,
    /// Also write the rendered HTML to this file.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local runs; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();

    // Fail on missing credentials before any network activity.
    let (ai, smtp) = if cli.dry_run {
        (AiSettings::from_env(), None)
    } else {
        let settings = Settings::from_env().context("email settings")?;
        (settings.ai, Some(settings.smtp))
    };

    let table = load_sources_default().context("loading source table")?;
    let relevance = RelevanceFilter::from_toml().context("loading relevance config")?;
    let categorizer = Categorizer::from_toml().context("loading categories")?;
    let summarizer = build_summarizer(&ai);
    let sender = smtp.as_ref().map(EmailSender::new).transpose()?;

    info!(
        sources = table.sources.len(),
        queries = table.queries.len(),
        days = cli.days,
        synthesis = summarizer.provider_name(),
        "starting digest run"
    );

    let now = now_canonical();
    let fetchers = FetcherSet::new(HttpClient::new()?);
    let plan = CollectPlan {
        sources: &table.sources,
        queries: &table.queries,
        search_base: &table.search_base,
        window_days: cli.days,
    };
    let collection = collect_all(&plan, &fetchers, &now).await;
    for f in &collection.failures {
        warn!(source = %f.source, error = %f.detail, "source failed");
    }

    let relevant: Vec<_> = collection
        .items
        .into_iter()
        .filter(|it| relevance.is_in_scope(it))
        .collect();
    let buckets = categorizer.bucketize(&relevant);
    let bucket_count = buckets.len();

    let digest = assemble(buckets, &categorizer, summarizer.as_ref(), &now, cli.days).await;
    let html = render_html(&digest);
    let subject_line = subject(&now);

    if let Some(path) = &cli.output {
        std::fs::write(path, &html)
            .with_context(|| format!("writing digest to {}", path.display()))?;
        info!(path = %path.display(), "digest written");
    }

    match sender {
        Some(sender) => sender.send_html(&subject_line, &html).await?,
        None => info!("dry run, email not sent"),
    }

    info!(
        items = relevant.len(),
        categories = bucket_count,
        failed_sources = collection.failures.len(),
        "digest complete"
    );
    Ok(())
}
