// Rust guideline compliant 2026-10-18

//! Event generator -- produces a lazy, chunked sequence of correlated
//! synthetic page views.
//!
//! Entry points: [`Generator::new`] (an [`Iterator`] over chunks) and
//! [`CorrelationState::advance`]. Configuration via [`GeneratorConfig::builder`].
//!
//! Only one chunk is materialized at a time, whatever the row cap: the caller
//! pulls the next chunk once it has finished writing the previous one.

use chrono::{DateTime, TimeDelta, Utc};
use domain::PageView;
use rand::seq::IndexedRandom as _;
use rand::{Rng, RngCore, SeedableRng, rngs::StdRng};
use std::iter::FusedIterator;
use std::num::NonZeroUsize;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// GeneratorError
// ---------------------------------------------------------------------------

/// Errors that can occur while configuring a generator.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// The supplied configuration is invalid.
    #[error("invalid generator configuration: {reason}")]
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Correlation probabilities
// ---------------------------------------------------------------------------

/// Transition probabilities of the user -> session -> page chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correlation {
    /// Probability that the next event keeps the previous user.
    pub same_user: f64,
    /// Probability that a repeated user keeps the previous session.
    pub same_session: f64,
    /// Probability that a repeated session keeps the previous page URL.
    pub same_page: f64,
}

impl Default for Correlation {
    fn default() -> Self {
        Self { same_user: 0.5, same_session: 0.5, same_page: 0.5 }
    }
}

impl Correlation {
    fn validate(&self) -> Result<(), GeneratorError> {
        for (name, p) in [
            ("same_user_probability", self.same_user),
            ("same_session_probability", self.same_session),
            ("same_page_probability", self.same_page),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(GeneratorError::InvalidConfig {
                    reason: format!("{name} must be in [0, 1], got {p}"),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// GeneratorConfig + builder
// ---------------------------------------------------------------------------

/// Runtime configuration for a [`Generator`].
///
/// Construct via [`GeneratorConfig::builder`].
#[derive(Debug, Clone)]
///
/// Fields are read-only once built, so a [`Generator`] only ever sees a
/// configuration that passed validation.
pub struct GeneratorConfig {
    max_rows: u64,
    chunk_size: NonZeroUsize,
    site: String,
    start: DateTime<Utc>,
    correlation: Correlation,
    seed: Option<u64>,
}

/// Builder for [`GeneratorConfig`].
///
/// Obtain via [`GeneratorConfig::builder`]; finalize with [`build`](Self::build).
#[derive(Debug)]
pub struct GeneratorConfigBuilder {
    max_rows: u64,
    chunk_size: usize,
    site: String,
    seconds_in_past: u64,
    start_at: Option<DateTime<Utc>>,
    correlation: Correlation,
    seed: Option<u64>,
}

impl GeneratorConfig {
    /// Total number of events to generate.
    #[must_use]
    pub fn max_rows(&self) -> u64 {
        self.max_rows
    }

    /// Number of events per chunk; the last chunk may be shorter.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size.get()
    }

    /// Value of the `site` field of every event.
    #[must_use]
    pub fn site(&self) -> &str {
        &self.site
    }

    /// Timestamp of the first event, truncated to whole milliseconds.
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Transition probabilities of the identifier chain.
    #[must_use]
    pub fn correlation(&self) -> &Correlation {
        &self.correlation
    }

    /// RNG seed for reproducible runs. `None` seeds from the OS.
    #[must_use]
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Create a builder. `max_rows` is the only required parameter.
    ///
    /// Default values: `chunk_size = 100`, `site = "showdown"`,
    /// `seconds_in_past = 0`, all correlation probabilities `0.5`, `seed = None`.
    #[must_use]
    pub fn builder(max_rows: u64) -> GeneratorConfigBuilder {
        GeneratorConfigBuilder {
            max_rows,
            chunk_size: 100,
            site: "showdown".to_owned(),
            seconds_in_past: 0,
            start_at: None,
            correlation: Correlation::default(),
            seed: None,
        }
    }
}

impl GeneratorConfigBuilder {
    /// Override the number of events per chunk.
    #[must_use]
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Override the `site` field.
    #[must_use]
    pub fn site(mut self, site: impl Into<String>) -> Self {
        self.site = site.into();
        self
    }

    /// Start the run this many seconds before now. Ignored when
    /// [`start_at`](Self::start_at) is set.
    #[must_use]
    pub fn seconds_in_past(mut self, seconds: u64) -> Self {
        self.seconds_in_past = seconds;
        self
    }

    /// Pin the timestamp of the first event (useful in tests).
    #[must_use]
    pub fn start_at(mut self, start: DateTime<Utc>) -> Self {
        self.start_at = Some(start);
        self
    }

    /// Probability that an event keeps the previous user.
    #[must_use]
    pub fn same_user_probability(mut self, p: f64) -> Self {
        self.correlation.same_user = p;
        self
    }

    /// Probability that a repeated user keeps the previous session.
    #[must_use]
    pub fn same_session_probability(mut self, p: f64) -> Self {
        self.correlation.same_session = p;
        self
    }

    /// Probability that a repeated session keeps the previous page URL.
    #[must_use]
    pub fn same_page_probability(mut self, p: f64) -> Self {
        self.correlation.same_page = p;
        self
    }

    /// Fix the RNG seed for deterministic output (useful in tests).
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate and build the configuration.
    ///
    /// Resolves the start instant now: either the pinned `start_at` or
    /// `Utc::now() - seconds_in_past`, truncated to milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`GeneratorError::InvalidConfig`] when `chunk_size` is zero,
    /// a probability lies outside `[0, 1]`, or the run's timestamps fall
    /// outside the representable range.
    #[must_use = "the Result must be checked; use ? or unwrap"]
    pub fn build(self) -> Result<GeneratorConfig, GeneratorError> {
        let Some(chunk_size) = NonZeroUsize::new(self.chunk_size) else {
            return Err(GeneratorError::InvalidConfig {
                reason: "chunk_size must be >= 1".to_owned(),
            });
        };
        self.correlation.validate()?;

        let out_of_range = || GeneratorError::InvalidConfig {
            reason: "run timestamps out of range".to_owned(),
        };
        let anchor = match self.start_at {
            Some(start) => start,
            None => i64::try_from(self.seconds_in_past)
                .ok()
                .and_then(TimeDelta::try_seconds)
                .and_then(|delta| Utc::now().checked_sub_signed(delta))
                .ok_or_else(out_of_range)?,
        };
        let start =
            DateTime::from_timestamp_millis(anchor.timestamp_millis()).ok_or_else(out_of_range)?;
        // The last event must still be representable.
        i64::try_from(self.max_rows)
            .ok()
            .and_then(TimeDelta::try_milliseconds)
            .and_then(|span| start.checked_add_signed(span))
            .ok_or_else(out_of_range)?;

        Ok(GeneratorConfig {
            max_rows: self.max_rows,
            chunk_size,
            site: self.site,
            start,
            correlation: self.correlation,
            seed: self.seed,
        })
    }
}

// ---------------------------------------------------------------------------
// CorrelationState
// ---------------------------------------------------------------------------

/// The identifiers of the most recently emitted event.
///
/// Threaded by value through each generation step; owned by exactly one
/// generator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationState {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub page_url: Uuid,
}

impl CorrelationState {
    /// Draw three fresh identifiers.
    #[must_use]
    pub fn fresh<R: RngCore>(rng: &mut R) -> Self {
        Self {
            user_id: random_id(rng),
            session_id: random_id(rng),
            page_url: random_id(rng),
        }
    }

    /// Compute the identifiers of the next event from the previous ones.
    ///
    /// The user repeats with `same_user`; only a repeated user may repeat its
    /// session (`same_session`), and only a repeated session may repeat its
    /// page (`same_page`). Every identifier that does not repeat is fresh.
    #[must_use]
    pub fn advance<R: Rng>(self, rng: &mut R, correlation: &Correlation) -> Self {
        if !rng.random_bool(correlation.same_user) {
            return Self::fresh(rng);
        }
        if !rng.random_bool(correlation.same_session) {
            return Self {
                user_id: self.user_id,
                session_id: random_id(rng),
                page_url: random_id(rng),
            };
        }
        if !rng.random_bool(correlation.same_page) {
            return Self { page_url: random_id(rng), ..self };
        }
        self
    }
}

/// Build a v4-layout UUID from raw random bytes of the (possibly seeded) RNG.
fn random_id<R: RngCore>(rng: &mut R) -> Uuid {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    uuid::Builder::from_random_bytes(bytes).into_uuid()
}

// ---------------------------------------------------------------------------
// Auxiliary field pools
// ---------------------------------------------------------------------------

const REFERRER_DOMAINS: &[&str] = &[
    "bing.com",
    "duckduckgo.com",
    "news.ycombinator.com",
    "reddit.com",
    "twitter.com",
    "linkedin.com",
    "medium.com",
    "github.com",
    "stackoverflow.com",
    "dev.to",
];

const UTM_SOURCES: &[&str] = &[
    "Acme Corp",
    "Globex",
    "Initech",
    "Umbrella Group",
    "Stark Industries",
    "Wayne Enterprises",
    "Hooli",
    "Vandelay Industries",
];

const UTM_MEDIUMS: &[(&str, u32)] = &[("cpc", 5), ("email", 3), ("social", 2)];

const UTM_CAMPAIGNS: &[&str] = &[
    "Chair", "Keyboard", "Shoes", "Table", "Gloves", "Towels", "Bike", "Lamp",
];

const DEVICE_TYPES: &[(&str, u32)] = &[("desktop", 50), ("mobile", 42), ("tablet", 8)];

/// `(iso code, country name, cities)` -- cities always belong to their country.
const GEO: &[(&str, &str, &[&str])] = &[
    ("BE", "Belgium", &["Brussels", "Antwerp", "Ghent"]),
    ("DE", "Germany", &["Berlin", "Hamburg", "Munich"]),
    ("FR", "France", &["Paris", "Lyon", "Marseille"]),
    ("GB", "United Kingdom", &["London", "Manchester", "Leeds"]),
    ("IE", "Ireland", &["Dublin", "Cork", "Galway"]),
    ("NL", "Netherlands", &["Amsterdam", "Rotterdam", "Utrecht"]),
    ("US", "United States", &["New York", "Chicago", "Seattle"]),
    ("ZA", "South Africa", &["Cape Town", "Johannesburg", "Durban"]),
];

fn pick<R: Rng>(rng: &mut R, pool: &[&str]) -> Option<String> {
    pool.choose(rng).map(|s| (*s).to_owned())
}

fn pick_weighted<R: Rng>(rng: &mut R, pool: &[(&str, u32)]) -> Option<String> {
    pool.choose_weighted(rng, |(_, weight)| *weight)
        .ok()
        .map(|(value, _)| (*value).to_owned())
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Finite, non-restartable iterator over chunks of correlated page views.
///
/// Yields `ceil(max_rows / chunk_size)` chunks whose lengths sum to
/// `max_rows`; every chunk is full except possibly the last. Event `i` is
/// opened exactly `i` milliseconds after the configured start.
#[derive(Debug)]
pub struct Generator {
    config: GeneratorConfig,
    rng: StdRng,
    state: CorrelationState,
    emitted: u64,
}

impl Generator {
    /// Create a new generator from `config`.
    ///
    /// Seeds the RNG from `config.seed` if set, otherwise from the OS.
    #[must_use]
    pub fn new(config: GeneratorConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let state = CorrelationState::fresh(&mut rng);
        tracing::debug!(
            max_rows = config.max_rows,
            chunk_size = config.chunk_size(),
            start = %config.start,
            "generator.created"
        );
        Self { config, rng, state, emitted: 0 }
    }

    /// Number of events not yet emitted.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.config.max_rows - self.emitted
    }

    fn next_view(&mut self) -> PageView {
        self.state = self.state.advance(&mut self.rng, &self.config.correlation);
        let rng = &mut self.rng;

        // `emitted < max_rows`, whose span was checked in `build`.
        let offset = i64::try_from(self.emitted).unwrap_or(i64::MAX);
        let page_opened_at = self.config.start + TimeDelta::milliseconds(offset);

        let referrer = rng.random_bool(0.2).then(|| {
            if rng.random_bool(0.4) {
                Some("google.com".to_owned())
            } else {
                pick(rng, REFERRER_DOMAINS)
            }
        });
        let (utm_source, utm_medium) = if rng.random_bool(0.1) {
            (pick(rng, UTM_SOURCES), pick_weighted(rng, UTM_MEDIUMS))
        } else {
            (None, None)
        };
        let utm_campaign = rng.random_bool(0.1).then(|| pick(rng, UTM_CAMPAIGNS)).flatten();
        let querystring = querystring(&[
            ("utm_source", utm_source.as_deref()),
            ("utm_medium", utm_medium.as_deref()),
            ("utm_campaign", utm_campaign.as_deref()),
        ]);

        let (country_iso, country_name, city_name) = match GEO.choose(rng) {
            Some((iso, country, cities)) => (
                Some((*iso).to_owned()),
                Some((*country).to_owned()),
                pick(rng, cities),
            ),
            None => (None, None, None),
        };

        let view = PageView {
            site: self.config.site.clone(),
            user_id: self.state.user_id.to_string(),
            session_id: self.state.session_id.to_string(),
            page_id: random_id(rng).to_string(),
            page_url: format!("/{}.html", self.state.page_url),
            page_opened_at,
            page_opened_at_date: Some(page_opened_at.date_naive()),
            time_on_page: rng.random_range(1..=60),
            country_iso,
            country_name,
            city_name,
            device_type: pick_weighted(rng, DEVICE_TYPES),
            is_bot: false,
            utm_source,
            utm_medium,
            utm_campaign,
            utm_term: None,
            utm_content: None,
            querystring,
            referrer: referrer.flatten(),
        };
        self.emitted += 1;
        view
    }
}

/// Render the present UTM parameters as `?key=value&...`; `None` if all absent.
fn querystring(params: &[(&str, Option<&str>)]) -> Option<String> {
    let pairs: Vec<String> = params
        .iter()
        .filter_map(|(key, value)| value.map(|v| format!("{key}={}", v.replace(' ', "+"))))
        .collect();
    (!pairs.is_empty()).then(|| format!("?{}", pairs.join("&")))
}

impl Iterator for Generator {
    type Item = Vec<PageView>;

    fn next(&mut self) -> Option<Self::Item> {
        let remaining = self.remaining();
        if remaining == 0 {
            return None;
        }
        let chunk_size = self.config.chunk_size.get();
        let len = usize::try_from(remaining).map_or(chunk_size, |r| r.min(chunk_size));
        let mut chunk = Vec::with_capacity(len);
        for _ in 0..len {
            chunk.push(self.next_view());
        }
        tracing::trace!(len, emitted = self.emitted, "generator.chunk.ready");
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let chunks = self.remaining().div_ceil(self.config.chunk_size.get() as u64);
        match usize::try_from(chunks) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

impl FusedIterator for Generator {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
