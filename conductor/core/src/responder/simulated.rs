//! Simulated Responder
//!
//! Produces replies from a fixed vocabulary after a random delay. The reply
//! is one opening phrase and one topic remark, drawn independently and
//! uniformly, joined by a single space. The prompt is never inspected.
//!
//! All randomness comes from the injected [`Rng`], so a seeded generator
//! gives reproducible delays and replies.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::phrases::{OPENINGS, TOPICS};
use super::traits::{ResponderError, ResponseGenerator};

/// Uniform range of simulated latencies
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DelayWindow {
    min: Duration,
    max: Duration,
}

impl DelayWindow {
    /// Create a window; bounds given in the wrong order are swapped
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Create a window from millisecond bounds
    #[must_use]
    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }

    /// No latency at all
    #[must_use]
    pub fn instant() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Lower bound
    pub fn min(&self) -> Duration {
        self.min
    }

    /// Upper bound
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draw a delay uniformly from the window (millisecond resolution)
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let min_ms = self.min.as_millis() as u64;
        let max_ms = self.max.as_millis() as u64;
        if min_ms >= max_ms {
            return self.min;
        }
        Duration::from_millis(rng.gen_range(min_ms..=max_ms))
    }

    /// Whether `delay` falls inside the window
    pub fn contains(&self, delay: Duration) -> bool {
        delay >= self.min && delay <= self.max
    }
}

impl Default for DelayWindow {
    fn default() -> Self {
        Self::from_millis(1000, 3000)
    }
}

/// Phrase tables the simulator draws from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vocabulary {
    openings: Vec<String>,
    topics: Vec<String>,
}

impl Vocabulary {
    /// Create a vocabulary; both tables must be non-empty
    pub fn new(openings: Vec<String>, topics: Vec<String>) -> Option<Self> {
        if openings.is_empty() || topics.is_empty() {
            return None;
        }
        Some(Self { openings, topics })
    }

    /// Opening phrases
    pub fn openings(&self) -> &[String] {
        &self.openings
    }

    /// Topic remarks
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// Pick one opening and one topic and join them
    pub fn compose<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let opening = &self.openings[rng.gen_range(0..self.openings.len())];
        let topic = &self.topics[rng.gen_range(0..self.topics.len())];
        format!("{opening} {topic}")
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            openings: OPENINGS.iter().map(ToString::to_string).collect(),
            topics: TOPICS.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Outcome decided before the delay starts
struct Draw {
    delay: Duration,
    reply: Result<String, ResponderError>,
}

/// Fixed-vocabulary response simulator
pub struct SimulatedResponder<R = StdRng> {
    rng: Mutex<R>,
    delay: DelayWindow,
    vocabulary: Vocabulary,
    failure_rate: f64,
    forced_failure: AtomicBool,
}

impl SimulatedResponder<StdRng> {
    /// Create a simulator seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Create a reproducible simulator
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng + Send> SimulatedResponder<R> {
    /// Create a simulator drawing from `rng`
    pub fn new(rng: R) -> Self {
        Self {
            rng: Mutex::new(rng),
            delay: DelayWindow::default(),
            vocabulary: Vocabulary::default(),
            failure_rate: 0.0,
            forced_failure: AtomicBool::new(false),
        }
    }

    /// Set the latency window
    #[must_use]
    pub fn with_delay(mut self, delay: DelayWindow) -> Self {
        self.delay = delay;
        self
    }

    /// Replace the phrase tables
    #[must_use]
    pub fn with_vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    /// Probability (0.0-1.0) that a reply fails
    #[must_use]
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = if rate.is_finite() {
            rate.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }

    /// Force every subsequent reply to fail (or stop forcing)
    pub fn set_forced_failure(&self, failing: bool) {
        self.forced_failure.store(failing, Ordering::SeqCst);
    }

    /// Latency window in use
    pub fn delay_window(&self) -> DelayWindow {
        self.delay
    }

    /// Phrase tables in use
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    fn draw(&self) -> Draw {
        let mut rng = self.rng.lock();
        let delay = self.delay.sample(&mut *rng);

        let failed = self.forced_failure.load(Ordering::SeqCst)
            || (self.failure_rate > 0.0 && rng.gen_bool(self.failure_rate));
        let reply = if failed {
            Err(ResponderError::Simulated)
        } else {
            Ok(self.vocabulary.compose(&mut *rng))
        };

        Draw { delay, reply }
    }
}

#[async_trait]
impl<R: Rng + Send> ResponseGenerator for SimulatedResponder<R> {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, ResponderError> {
        let Draw { delay, reply } = self.draw();
        tracing::debug!(
            delay_ms = delay.as_millis() as u64,
            failing = reply.is_err(),
            "Simulating response latency"
        );

        tokio::time::sleep(delay).await;
        reply
    }
}
