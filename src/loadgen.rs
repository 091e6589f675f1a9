//! Load generator for the comparison endpoint.
//!
//! Simulated users each load two images once, then repeatedly post them to
//! `/compare` with a random pause between requests. Only availability and
//! latency are recorded: a request counts as a success when the server
//! answers `200 OK`, whatever the score says.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{AppError, Result};
use crate::models::comparison::ComparisonRequest;

/// 1x1 grayscale PNG used when an image file cannot be read.
pub const PLACEHOLDER_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNk+A8AAQUBAScY42YAAAAASUVORK5CYII=";

/// Uniform random pause between a user's requests
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaitTime {
    min: Duration,
    max: Duration,
}

impl WaitTime {
    /// Pause between `min_secs` and `max_secs` seconds.
    pub fn between(min_secs: f64, max_secs: f64) -> Result<Self> {
        if !(min_secs.is_finite() && max_secs.is_finite()) || min_secs < 0.0 || min_secs > max_secs {
            return Err(AppError::InvalidInput(format!(
                "wait time range {}..{} must satisfy 0 <= min <= max",
                min_secs, max_secs
            )));
        }
        Ok(Self {
            min: seconds(min_secs, "minimum wait")?,
            max: seconds(max_secs, "maximum wait")?,
        })
    }

    /// Draw a pause from the range
    pub fn sample(&self) -> Duration {
        self.min + (self.max - self.min).mul_f64(fastrand::f64())
    }
}

fn seconds(value: f64, what: &str) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .map_err(|e| AppError::InvalidInput(format!("{} of {}s is out of range: {}", what, value, e)))
}

impl Default for WaitTime {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(1),
            max: Duration::from_secs(3),
        }
    }
}

/// Load test parameters
#[derive(Clone, Debug)]
pub struct LoadTestConfig {
    /// Base URL of the service, e.g. `http://localhost:8000`
    pub host: String,
    /// Number of simulated users
    pub users: usize,
    /// Users started per second
    pub spawn_rate: f64,
    /// Pause between a user's requests
    pub wait: WaitTime,
    /// Stop after this long
    pub run_time: Option<Duration>,
    /// Stop each user after this many requests
    pub iterations: Option<usize>,
    /// First image file
    pub image1: Option<PathBuf>,
    /// Second image file
    pub image2: Option<PathBuf>,
}

impl Default for LoadTestConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:8000".to_string(),
            users: 10,
            spawn_rate: 1.0,
            wait: WaitTime::default(),
            run_time: Some(Duration::from_secs(60)),
            iterations: None,
            image1: None,
            image2: None,
        }
    }
}

impl LoadTestConfig {
    fn compare_url(&self) -> String {
        format!("{}/compare", self.host.trim_end_matches('/'))
    }

    /// Delay before `user` starts, at `spawn_rate` users per second
    fn spawn_delay(&self, user: usize) -> Result<Duration> {
        let stagger = seconds(1.0 / self.spawn_rate, "spawn interval")?;
        u32::try_from(user)
            .ok()
            .and_then(|user| stagger.checked_mul(user))
            .ok_or_else(|| {
                AppError::InvalidInput(format!(
                    "spawn rate {} is too low to start {} users",
                    self.spawn_rate, self.users
                ))
            })
    }

    fn validate(&self) -> Result<()> {
        if self.users == 0 {
            return Err(AppError::InvalidInput("at least one user is required".to_string()));
        }
        if !(self.spawn_rate.is_finite() && self.spawn_rate > 0.0) {
            return Err(AppError::InvalidInput("spawn rate must be positive".to_string()));
        }
        self.spawn_delay(self.users - 1)?;
        if self.run_time.is_none() && self.iterations.is_none() {
            return Err(AppError::InvalidInput(
                "either a run time or an iteration count is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Read an image file and base64-encode it, falling back to the placeholder.
pub fn load_image_base64(path: Option<&Path>) -> String {
    let Some(path) = path else {
        return PLACEHOLDER_PNG_BASE64.to_string();
    };

    match std::fs::read(path) {
        Ok(bytes) => STANDARD.encode(bytes),
        Err(e) => {
            log::warn!(
                "Could not read {} ({}), using placeholder image",
                path.display(),
                e
            );
            PLACEHOLDER_PNG_BASE64.to_string()
        }
    }
}

#[derive(Debug, Default)]
struct UserStats {
    successes: usize,
    failures: BTreeMap<String, usize>,
    latencies: Vec<Duration>,
}

impl UserStats {
    fn merge(&mut self, other: UserStats) {
        self.successes += other.successes;
        for (reason, count) in other.failures {
            *self.failures.entry(reason).or_default() += count;
        }
        self.latencies.extend(other.latencies);
    }
}

/// Aggregated outcome of a load test
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Requests answered with 200
    pub successes: usize,
    /// Failure reasons with their counts
    pub failures: BTreeMap<String, usize>,
    /// Latency of every request, sorted ascending
    pub latencies: Vec<Duration>,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl LoadReport {
    fn from_stats(mut stats: UserStats, elapsed: Duration) -> Self {
        stats.latencies.sort();
        Self {
            successes: stats.successes,
            failures: stats.failures,
            latencies: stats.latencies,
            elapsed,
        }
    }

    /// Total requests issued
    pub fn total(&self) -> usize {
        self.successes + self.failure_count()
    }

    /// Requests that did not get a 200
    pub fn failure_count(&self) -> usize {
        self.failures.values().sum()
    }

    /// Latency at quantile `q` in [0, 1]
    pub fn percentile(&self, q: f64) -> Option<Duration> {
        if self.latencies.is_empty() {
            return None;
        }
        let rank = (q.clamp(0.0, 1.0) * (self.latencies.len() - 1) as f64).round() as usize;
        self.latencies.get(rank).copied()
    }

    /// Mean latency
    pub fn mean(&self) -> Option<Duration> {
        if self.latencies.is_empty() {
            return None;
        }
        let total: Duration = self.latencies.iter().sum();
        Some(total / self.latencies.len() as u32)
    }
}

fn millis(d: Option<Duration>) -> String {
    d.map(|d| format!("{:.1}ms", d.as_secs_f64() * 1000.0))
        .unwrap_or_else(|| "-".to_string())
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Requests:  {}", self.total())?;
        writeln!(f, "Successes: {}", self.successes)?;
        writeln!(f, "Failures:  {}", self.failure_count())?;
        let rps = self.total() as f64 / self.elapsed.as_secs_f64().max(f64::EPSILON);
        writeln!(f, "Duration:  {:.1}s ({:.2} req/s)", self.elapsed.as_secs_f64(), rps)?;
        writeln!(
            f,
            "Latency:   min {} / mean {} / p50 {} / p95 {} / max {}",
            millis(self.latencies.first().copied()),
            millis(self.mean()),
            millis(self.percentile(0.5)),
            millis(self.percentile(0.95)),
            millis(self.latencies.last().copied()),
        )?;
        for (reason, count) in &self.failures {
            writeln!(f, "  {:>6}  {}", count, reason)?;
        }
        Ok(())
    }
}

/// Run the load test to completion.
pub async fn run(config: LoadTestConfig) -> Result<LoadReport> {
    config.validate()?;

    let client = reqwest::Client::new();
    let started = Instant::now();
    // A run time past the end of the clock means no deadline
    let deadline = config.run_time.and_then(|run_time| started.checked_add(run_time));

    log::info!(
        "Starting {} user(s) against {} ({} per second)",
        config.users,
        config.compare_url(),
        config.spawn_rate
    );

    let mut handles = Vec::with_capacity(config.users);
    for user in 0..config.users {
        let delay = config.spawn_delay(user)?;
        let client = client.clone();
        let config = config.clone();
        handles.push(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            simulate_user(user, client, config, deadline).await
        }));
    }

    let mut stats = UserStats::default();
    for outcome in futures::future::join_all(handles).await {
        stats.merge(outcome?);
    }

    let report = LoadReport::from_stats(stats, started.elapsed());
    log::info!(
        "Load test finished: {} requests, {} failures",
        report.total(),
        report.failure_count()
    );
    Ok(report)
}

async fn simulate_user(
    user: usize,
    client: reqwest::Client,
    config: LoadTestConfig,
    deadline: Option<Instant>,
) -> UserStats {
    let payload = ComparisonRequest {
        image1: load_image_base64(config.image1.as_deref()),
        image2: load_image_base64(config.image2.as_deref()),
    };
    let url = config.compare_url();
    let mut stats = UserStats::default();
    let mut issued = 0usize;

    loop {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        if config.iterations.is_some_and(|n| issued >= n) {
            break;
        }

        let sent = Instant::now();
        let outcome = client.post(&url).json(&payload).send().await;
        stats.latencies.push(sent.elapsed());
        issued += 1;

        match outcome {
            Ok(response) if response.status() == reqwest::StatusCode::OK => stats.successes += 1,
            Ok(response) => {
                let reason = format!("Failed with status code: {}", response.status().as_u16());
                log::debug!("user {}: {}", user, reason);
                *stats.failures.entry(reason).or_default() += 1;
            }
            Err(e) => {
                log::debug!("user {}: request error: {}", user, e);
                *stats.failures.entry(format!("Request error: {}", e)).or_default() += 1;
            }
        }

        let pause = config.wait.sample();
        match deadline {
            Some(d) if Instant::now().checked_add(pause).map_or(true, |wake| wake >= d) => break,
            _ => tokio::time::sleep(pause).await,
        }
    }

    stats
}
