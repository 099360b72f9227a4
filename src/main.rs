mod config;
mod dedup;
mod enrich;
mod error;
mod export;
mod models;
mod orchestrator;
mod render;
mod sources;
#[cfg(test)]
mod testing;
mod websearch;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::{CacheAction, Command, Config, SearchArgs};
use crate::dedup::DedupCache;
use crate::enrich::ContactEnricher;
use crate::orchestrator::{Orchestrator, Pacing};
use crate::render::HttpRenderer;
use crate::sources::SearchCriteria;
use crate::websearch::BraveSearcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("headhunter=info")),
        )
        .init();

    let config = Config::parse();

    match config.resolved_command() {
        Command::Search(args) => run_search(&config, args).await,
        Command::Cache { action } => run_cache(&config, action),
    }
}

async fn run_search(config: &Config, args: SearchArgs) -> anyhow::Result<()> {
    let renderer = Arc::new(HttpRenderer::with_timeout_ms(
        args.nav_timeout_ms,
        args.settle_ms,
    )?);

    let pacing = Pacing {
        between_platforms: Duration::from_millis(args.platform_delay_ms),
        between_companies: Duration::from_millis(args.company_delay_ms),
        between_details: Duration::from_millis(args.detail_delay_ms),
    };

    let sources = sources::build(&args.platforms, renderer.clone(), pacing.between_details);
    let cache = DedupCache::load(&config.cache_path);

    let enricher = if args.no_enrich {
        None
    } else if config.brave_api_key.is_empty() {
        tracing::warn!("BRAVE_API_KEY not set, skipping contact enrichment");
        None
    } else {
        Some(ContactEnricher::new(
            renderer.clone(),
            Arc::new(BraveSearcher::new(config.brave_api_key.clone())),
            pacing.between_companies,
        ))
    };

    let mut criteria = SearchCriteria::new(args.keyword.clone());
    criteria.location = args.location.clone();
    criteria.min_salary = args.min_salary;
    criteria.max_results = args.max_results;

    let mut orchestrator = Orchestrator::new(sources, cache, enricher, pacing);
    let report = orchestrator.run(&criteria).await;

    if report.no_platforms {
        tracing::warn!("Nothing to do: no platforms enabled");
        return Ok(());
    }
    if report.postings.is_empty() {
        tracing::info!(
            "No new postings ({} suppressed as duplicates)",
            report.duplicates
        );
        return Ok(());
    }

    let out = args
        .out
        .clone()
        .unwrap_or_else(|| default_out_path(&args.keyword));
    export::write_csv(&out, &report.postings)?;

    tracing::info!(
        "{} new postings, {} suppressed as duplicates",
        report.postings.len(),
        report.duplicates
    );
    for (platform, found) in &report.found_per_platform {
        tracing::info!(
            "{platform}: {found} found, {} exported",
            report.dataset_for(*platform).len()
        );
    }
    tracing::info!("Saved {}", out.display());

    Ok(())
}

fn default_out_path(keyword: &str) -> PathBuf {
    let date = chrono::Utc::now().format("%Y-%m-%d");
    let slug = keyword.split_whitespace().collect::<Vec<_>>().join("_");
    PathBuf::from(format!("data/jobs_{slug}_{date}.csv"))
}

fn run_cache(config: &Config, action: CacheAction) -> anyhow::Result<()> {
    let mut cache = DedupCache::load(&config.cache_path);
    match action {
        CacheAction::Stats => {
            let stats = cache.stats();
            tracing::info!("Cache file: {}", cache.path().display());
            tracing::info!("Cache entries: {}", stats.total);
            for (platform, count) in &stats.by_platform {
                tracing::info!("  {platform}: {count}");
            }
            tracing::info!("Last cleanup: {}", stats.last_cleanup);
        }
        CacheAction::Clear => {
            cache.clear()?;
            tracing::info!("Cache cleared");
        }
    }
    Ok(())
}
