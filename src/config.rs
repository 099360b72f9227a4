use std::path::PathBuf;

use clap::Parser;

use crate::models::posting::SourcePlatform;

#[derive(Parser, Debug, Clone)]
#[command(name = "headhunter", about = "Job-posting aggregator with contact enrichment")]
pub struct Config {
    /// Dedup cache file path
    #[arg(long, env = "CACHE_PATH", default_value = "data/cache/seen_jobs.json")]
    pub cache_path: PathBuf,

    /// Brave Search API key; empty disables website discovery
    #[arg(long, env = "BRAVE_API_KEY", default_value = "", hide_env_values = true)]
    pub brave_api_key: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Run one aggregation batch (default when no subcommand given)
    Search(SearchArgs),
    /// Inspect or reset the dedup cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum CacheAction {
    /// Show entry counts per platform and the last cleanup time
    Stats,
    /// Drop every cache entry
    Clear,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SearchArgs {
    /// Search keyword
    #[arg(default_value = "AI 工程師")]
    pub keyword: String,

    /// Location filter (platform-dependent, empty = anywhere)
    #[arg(default_value = "")]
    pub location: String,

    /// Minimum monthly salary in TWD, 0 disables the filter
    #[arg(long, default_value_t = 0)]
    pub min_salary: u32,

    /// Maximum postings per platform
    #[arg(long, default_value_t = 20)]
    pub max_results: usize,

    /// Platforms to search
    #[arg(long, value_delimiter = ',', default_value = "104,1111,cake")]
    pub platforms: Vec<SourcePlatform>,

    /// Skip contact enrichment
    #[arg(long)]
    pub no_enrich: bool,

    /// Output CSV path (defaults to data/jobs_<keyword>_<date>.csv)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Delay between platform searches, in milliseconds
    #[arg(long, env = "PLATFORM_DELAY_MS", default_value_t = 60_000)]
    pub platform_delay_ms: u64,

    /// Delay between company website lookups, in milliseconds
    #[arg(long, env = "COMPANY_DELAY_MS", default_value_t = 2_000)]
    pub company_delay_ms: u64,

    /// Delay between detail-page bursts, in milliseconds
    #[arg(long, env = "DETAIL_DELAY_MS", default_value_t = 3_000)]
    pub detail_delay_ms: u64,

    /// Page navigation timeout, in milliseconds
    #[arg(long, env = "NAV_TIMEOUT_MS", default_value_t = 30_000)]
    pub nav_timeout_ms: u64,

    /// Settle delay after page load, in milliseconds
    #[arg(long, env = "SETTLE_MS", default_value_t = 2_000)]
    pub settle_ms: u64,
}

impl Default for SearchArgs {
    fn default() -> Self {
        Self {
            keyword: "AI 工程師".to_string(),
            location: String::new(),
            min_salary: 0,
            max_results: 20,
            platforms: vec![
                SourcePlatform::Tw104,
                SourcePlatform::Tw1111,
                SourcePlatform::Cake,
            ],
            no_enrich: false,
            out: None,
            platform_delay_ms: 60_000,
            company_delay_ms: 2_000,
            detail_delay_ms: 3_000,
            nav_timeout_ms: 30_000,
            settle_ms: 2_000,
        }
    }
}

impl Config {
    /// Resolve the command, defaulting to a search with default parameters.
    pub fn resolved_command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Search(SearchArgs::default()))
    }
}
