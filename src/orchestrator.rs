// Aggregation orchestrator.
// Drives one end-to-end batch: adapters → dedup → enrichment.

use std::time::Duration;

use crate::dedup::DedupCache;
use crate::enrich::ContactEnricher;
use crate::models::posting::{JobPosting, SourcePlatform};
use crate::sources::{JobSource, SearchCriteria};

/// Inter-step delay policy. Injected so tests and callers can tune or zero
/// the pacing; the values are configuration, not invariants.
#[derive(Debug, Clone)]
pub struct Pacing {
    /// Between adapter invocations.
    pub between_platforms: Duration,
    /// Between website lookups for different companies.
    pub between_companies: Duration,
    /// Between detail-page bursts within an adapter.
    pub between_details: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            between_platforms: Duration::from_secs(60),
            between_companies: Duration::from_secs(2),
            between_details: Duration::from_secs(3),
        }
    }
}

impl Pacing {
    pub fn zero() -> Self {
        Self {
            between_platforms: Duration::ZERO,
            between_companies: Duration::ZERO,
            between_details: Duration::ZERO,
        }
    }
}

/// Outcome of one batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Final postings, deduplicated and enriched, in source order.
    pub postings: Vec<JobPosting>,
    /// Postings suppressed by the dedup cache.
    pub duplicates: usize,
    /// Postings found per platform before dedup.
    pub found_per_platform: Vec<(SourcePlatform, usize)>,
    /// Set when the orchestrator was invoked with no platforms enabled;
    /// the batch is empty by configuration, not by failure.
    pub no_platforms: bool,
}

impl BatchReport {
    /// Final dataset for one platform, for per-platform consumers.
    pub fn dataset_for(&self, platform: SourcePlatform) -> Vec<&JobPosting> {
        self.postings
            .iter()
            .filter(|p| p.platform == platform.as_str())
            .collect()
    }
}

pub struct Orchestrator {
    sources: Vec<Box<dyn JobSource>>,
    cache: DedupCache,
    enricher: Option<ContactEnricher>,
    pacing: Pacing,
}

impl Orchestrator {
    pub fn new(
        sources: Vec<Box<dyn JobSource>>,
        cache: DedupCache,
        enricher: Option<ContactEnricher>,
        pacing: Pacing,
    ) -> Self {
        Self {
            sources,
            cache,
            enricher,
            pacing,
        }
    }

    /// Run one batch. A platform failure never blocks the others and an
    /// enrichment failure never blocks the batch; the report carries
    /// whatever subset succeeded.
    pub async fn run(&mut self, criteria: &SearchCriteria) -> BatchReport {
        if self.sources.is_empty() {
            tracing::warn!("No platforms enabled, returning empty batch");
            return BatchReport {
                no_platforms: true,
                ..BatchReport::default()
            };
        }

        let mut batch = Vec::new();
        let mut found_per_platform = Vec::new();
        let source_count = self.sources.len();

        for (i, source) in self.sources.iter().enumerate() {
            let platform = source.platform();
            tracing::info!("Searching {platform} for '{}'", criteria.keyword);

            let postings = match source.search(criteria).await {
                Ok(postings) => postings,
                Err(e) => {
                    tracing::error!("{platform} search failed: {e}");
                    Vec::new()
                }
            };
            tracing::info!("{platform}: {} postings", postings.len());
            found_per_platform.push((platform, postings.len()));

            for mut posting in postings {
                posting.platform = platform.as_str().to_string();
                batch.push(posting);
            }

            if i + 1 < source_count && !self.pacing.between_platforms.is_zero() {
                tokio::time::sleep(self.pacing.between_platforms).await;
            }
        }

        let (unique, duplicates) = self.cache.filter(batch);
        tracing::info!(
            "Dedup: {} new, {} already seen",
            unique.len(),
            duplicates.len()
        );

        // Persist after the filter pass so an aborted enrichment still
        // leaves the cache reflecting what was marked seen.
        self.cache.mark_seen(&unique);
        if let Err(e) = self.cache.save() {
            tracing::warn!("Dedup cache save failed: {e}");
        }

        let postings = match &self.enricher {
            Some(enricher) => enricher.enrich(unique).await,
            None => unique,
        };

        BatchReport {
            postings,
            duplicates: duplicates.len(),
            found_per_platform,
            no_platforms: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use async_trait::async_trait;

    struct StaticSource {
        platform: SourcePlatform,
        postings: Vec<JobPosting>,
        fail: bool,
    }

    impl StaticSource {
        fn ok(platform: SourcePlatform, titles: &[&str]) -> Self {
            let postings = titles
                .iter()
                .map(|t| {
                    let mut p =
                        JobPosting::new(platform, format!("{t}公司"), (*t).to_string());
                    p.link = format!("https://{}.example.tw/job/{t}", platform);
                    p
                })
                .collect();
            Self {
                platform,
                postings,
                fail: false,
            }
        }

        fn failing(platform: SourcePlatform) -> Self {
            Self {
                platform,
                postings: Vec::new(),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl JobSource for StaticSource {
        fn platform(&self) -> SourcePlatform {
            self.platform
        }

        async fn search(&self, _: &SearchCriteria) -> Result<Vec<JobPosting>, AppError> {
            if self.fail {
                return Err(AppError::Render("selector timeout".into()));
            }
            Ok(self.postings.clone())
        }
    }

    fn cache() -> (tempfile::TempDir, DedupCache) {
        let dir = tempfile::tempdir().unwrap();
        let cache = DedupCache::load(dir.path().join("seen_jobs.json"));
        (dir, cache)
    }

    #[tokio::test]
    async fn platform_failure_does_not_block_the_others() {
        let (_dir, cache) = cache();
        let sources: Vec<Box<dyn JobSource>> = vec![
            Box::new(StaticSource::failing(SourcePlatform::Tw104)),
            Box::new(StaticSource::ok(SourcePlatform::Tw1111, &["a", "b"])),
        ];
        let mut orch = Orchestrator::new(sources, cache, None, Pacing::zero());

        let report = orch.run(&SearchCriteria::new("x")).await;
        assert_eq!(report.postings.len(), 2);
        assert_eq!(
            report.found_per_platform,
            vec![(SourcePlatform::Tw104, 0), (SourcePlatform::Tw1111, 2)]
        );
    }

    #[tokio::test]
    async fn postings_keep_source_order_and_get_tagged() {
        let (_dir, cache) = cache();
        let sources: Vec<Box<dyn JobSource>> = vec![
            Box::new(StaticSource::ok(SourcePlatform::Tw104, &["a", "b"])),
            Box::new(StaticSource::ok(SourcePlatform::Cake, &["c"])),
        ];
        let mut orch = Orchestrator::new(sources, cache, None, Pacing::zero());

        let report = orch.run(&SearchCriteria::new("x")).await;
        let titles: Vec<_> = report.postings.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
        assert_eq!(report.postings[0].platform, "104");
        assert_eq!(report.postings[2].platform, "cake");
        assert_eq!(report.dataset_for(SourcePlatform::Tw104).len(), 2);
        assert_eq!(report.dataset_for(SourcePlatform::Cake).len(), 1);
    }

    #[tokio::test]
    async fn second_run_is_fully_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen_jobs.json");

        for run in 0..2 {
            let sources: Vec<Box<dyn JobSource>> = vec![Box::new(StaticSource::ok(
                SourcePlatform::Tw104,
                &["a", "b", "c"],
            ))];
            let mut orch = Orchestrator::new(
                sources,
                DedupCache::load(&path),
                None,
                Pacing::zero(),
            );
            let report = orch.run(&SearchCriteria::new("x")).await;

            if run == 0 {
                assert_eq!(report.postings.len(), 3);
                assert_eq!(report.duplicates, 0);
            } else {
                assert!(report.postings.is_empty());
                assert_eq!(report.duplicates, 3);
            }
        }
    }

    #[tokio::test]
    async fn no_platforms_is_an_explicit_empty_signal() {
        let (_dir, cache) = cache();
        let mut orch = Orchestrator::new(Vec::new(), cache, None, Pacing::zero());

        let report = orch.run(&SearchCriteria::new("x")).await;
        assert!(report.no_platforms);
        assert!(report.postings.is_empty());
    }
}
