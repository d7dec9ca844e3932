//! Crawl configuration: defaults, an optional TOML file, then environment
//! overrides. Command-line flags are applied by the binary on top.

use std::path::Path;
use std::time::Duration;

use booktags_api::{
    default_identities, Identity, IdentityPool, RandomPick, RoundRobin, Rotation,
    DEFAULT_BASE_URL, DEFAULT_TIMEOUT,
};
use rand::Rng;
use serde::Deserialize;

use crate::error::BookTagsError;
use crate::selectors::{Selectors, SiteSelectors};

/// Items per listing page on the site.
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_MAX_MISSES: u32 = 3;
pub const DEFAULT_DELAY_MIN: Duration = Duration::from_millis(2000);
pub const DEFAULT_DELAY_MAX: Duration = Duration::from_millis(5000);

/// When the minimum-engagement filter is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Keep everything while crawling; filter once afterwards.
    #[default]
    AfterCrawl,
    /// Drop below-threshold items as each page is accumulated.
    Eager,
}

/// How identities are chosen for successive requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationKind {
    #[default]
    RoundRobin,
    Random,
}

/// Bounds of the randomized pause taken before every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min: Duration,
    pub max: Duration,
}

impl DelayRange {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// No pause at all.
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Draws a pause uniformly from `min..=max` (millisecond resolution).
    pub fn sample(&self) -> Duration {
        if self.max.is_zero() || self.min >= self.max {
            return self.min.min(self.max);
        }
        let lo = self.min.as_millis() as u64;
        let hi = self.max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY_MIN, DEFAULT_DELAY_MAX)
    }
}

/// The subset of configuration the crawler consults on every step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlPolicy {
    pub delay: DelayRange,
    /// Consecutive fetch failures that end a topic.
    pub max_retries: u32,
    /// Consecutive pages without item blocks that end a topic.
    pub max_misses: u32,
    pub page_size: u32,
    pub filter_mode: FilterMode,
}

impl Default for CrawlPolicy {
    fn default() -> Self {
        Self {
            delay: DelayRange::default(),
            max_retries: DEFAULT_MAX_RETRIES,
            max_misses: DEFAULT_MAX_MISSES,
            page_size: DEFAULT_PAGE_SIZE,
            filter_mode: FilterMode::default(),
        }
    }
}

/// Everything needed to build a crawler.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub policy: CrawlPolicy,
    pub rotation: RotationKind,
    pub identities: Vec<Identity>,
    pub selectors: SiteSelectors,
    /// Look up missing engagement counts on detail pages.
    pub detail_lookup: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            policy: CrawlPolicy::default(),
            rotation: RotationKind::default(),
            identities: default_identities(),
            selectors: SiteSelectors::default(),
            detail_lookup: false,
        }
    }
}

/// Shape of the optional TOML configuration file. Every key is optional.
///
/// ```toml
/// delay_min_ms = 1000
/// delay_max_ms = 3000
/// max_retries = 4
/// filter_mode = "eager"
/// rotation = "random"
/// user_agents = ["Mozilla/5.0 ..."]
///
/// [selectors]
/// item = "li.subject-item"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub delay_min_ms: Option<u64>,
    pub delay_max_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub max_misses: Option<u32>,
    pub page_size: Option<u32>,
    pub filter_mode: Option<FilterMode>,
    pub rotation: Option<RotationKind>,
    pub detail_lookup: Option<bool>,
    pub user_agents: Option<Vec<String>>,
    pub selectors: Option<SiteSelectors>,
}

impl FileConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, BookTagsError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, BookTagsError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

impl CrawlConfig {
    /// Overlays every key present in `file`.
    pub fn apply_file(&mut self, file: FileConfig) {
        if let Some(base_url) = file.base_url {
            self.base_url = base_url;
        }
        if let Some(ms) = file.delay_min_ms {
            self.policy.delay.min = Duration::from_millis(ms);
        }
        if let Some(ms) = file.delay_max_ms {
            self.policy.delay.max = Duration::from_millis(ms);
        }
        if let Some(secs) = file.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(n) = file.max_retries {
            self.policy.max_retries = n;
        }
        if let Some(n) = file.max_misses {
            self.policy.max_misses = n;
        }
        if let Some(n) = file.page_size {
            self.policy.page_size = n;
        }
        if let Some(mode) = file.filter_mode {
            self.policy.filter_mode = mode;
        }
        if let Some(rotation) = file.rotation {
            self.rotation = rotation;
        }
        if let Some(on) = file.detail_lookup {
            self.detail_lookup = on;
        }
        if let Some(agents) = file.user_agents {
            self.identities = agents.into_iter().map(Identity::browser).collect();
        }
        if let Some(selectors) = file.selectors {
            self.selectors = selectors;
        }
    }

    /// Applies `BOOKTAGS_*` variables from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Applies `BOOKTAGS_*` variables read through `lookup`. Unparseable
    /// values are skipped with a warning.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("BOOKTAGS_BASE_URL").filter(|u| !u.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        if let Some(ms) = env_u64(&lookup, "BOOKTAGS_DELAY_MIN_MS") {
            self.policy.delay.min = Duration::from_millis(ms);
        }
        if let Some(ms) = env_u64(&lookup, "BOOKTAGS_DELAY_MAX_MS") {
            self.policy.delay.max = Duration::from_millis(ms);
        }
        if let Some(secs) = env_u64(&lookup, "BOOKTAGS_TIMEOUT_SECS") {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(n) = env_u32(&lookup, "BOOKTAGS_MAX_RETRIES") {
            self.policy.max_retries = n;
        }
        if let Some(n) = env_u32(&lookup, "BOOKTAGS_MAX_MISSES") {
            self.policy.max_misses = n;
        }
    }

    pub fn validate(&self) -> Result<(), BookTagsError> {
        if self.policy.delay.min > self.policy.delay.max {
            return Err(BookTagsError::Config(format!(
                "delay minimum ({} ms) exceeds maximum ({} ms)",
                self.policy.delay.min.as_millis(),
                self.policy.delay.max.as_millis()
            )));
        }
        if self.policy.max_retries == 0 {
            return Err(BookTagsError::Config(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if self.policy.max_misses == 0 {
            return Err(BookTagsError::Config(
                "max_misses must be at least 1".to_string(),
            ));
        }
        if self.policy.page_size == 0 {
            return Err(BookTagsError::Config(
                "page_size must be at least 1".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(BookTagsError::Config(
                "timeout must be greater than zero".to_string(),
            ));
        }
        if self.identities.is_empty() {
            return Err(BookTagsError::Config(
                "at least one user agent is required".to_string(),
            ));
        }
        Selectors::compile(&self.selectors)?;
        Ok(())
    }

    pub fn identity_pool(&self) -> Result<IdentityPool, BookTagsError> {
        let rotation: Box<dyn Rotation> = match self.rotation {
            RotationKind::RoundRobin => Box::new(RoundRobin),
            RotationKind::Random => Box::new(RandomPick::from_entropy()),
        };
        Ok(IdentityPool::new(self.identities.clone(), rotation)?)
    }
}

fn env_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("ignoring {}={:?}: not a non-negative integer", key, raw);
            None
        }
    }
}

fn env_u32(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u32> {
    env_u64(lookup, key).and_then(|v| u32::try_from(v).ok())
}
