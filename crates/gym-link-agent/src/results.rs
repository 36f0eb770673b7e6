//! Aggregate statistics over a batch of episodes.

use gym_link_core::EpisodeResult;
use serde_json::{Value, json};

/// Summary view over the results of one batch of episodes.
#[derive(Debug, Clone, Default)]
pub struct EpisodeResults {
    episodes: Vec<EpisodeResult>,
}

impl EpisodeResults {
    pub fn new(episodes: Vec<EpisodeResult>) -> Self {
        Self { episodes }
    }

    pub fn episodes(&self) -> &[EpisodeResult] {
        &self.episodes
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    /// Episodes that succeeded without an error.
    pub fn success_count(&self) -> usize {
        self.episodes.iter().filter(|e| e.is_success()).count()
    }

    /// Episodes cut short by an error.
    pub fn failure_count(&self) -> usize {
        self.episodes.iter().filter(|e| e.error.is_some()).count()
    }

    /// Fraction of successful episodes, 0.0 for an empty batch.
    pub fn success_rate(&self) -> f64 {
        if self.episodes.is_empty() {
            return 0.0;
        }
        self.success_count() as f64 / self.episodes.len() as f64
    }

    pub fn mean_reward(&self) -> f64 {
        mean(self.rewards())
    }

    pub fn min_reward(&self) -> Option<f64> {
        self.rewards().reduce(f64::min)
    }

    pub fn max_reward(&self) -> Option<f64> {
        self.rewards().reduce(f64::max)
    }

    /// Population standard deviation of episode rewards.
    pub fn reward_stddev(&self) -> f64 {
        if self.episodes.is_empty() {
            return 0.0;
        }
        let mean = self.mean_reward();
        let variance = self
            .rewards()
            .map(|r| (r - mean).powi(2))
            .sum::<f64>()
            / self.episodes.len() as f64;
        variance.sqrt()
    }

    pub fn mean_steps(&self) -> f64 {
        mean(self.episodes.iter().map(|e| e.num_steps as f64))
    }

    /// Episodes that ended in an error, for inspection or retry.
    pub fn failed(&self) -> Vec<&EpisodeResult> {
        self.episodes.iter().filter(|e| e.error.is_some()).collect()
    }

    /// Summary as a JSON object, for logging or export.
    pub fn summary(&self) -> Value {
        json!({
            "episodes": self.len(),
            "successes": self.success_count(),
            "failures": self.failure_count(),
            "success_rate": self.success_rate(),
            "mean_reward": self.mean_reward(),
            "min_reward": self.min_reward(),
            "max_reward": self.max_reward(),
            "reward_stddev": self.reward_stddev(),
            "mean_steps": self.mean_steps(),
        })
    }

    fn rewards(&self) -> impl Iterator<Item = f64> + '_ {
        self.episodes.iter().map(|e| e.total_reward)
    }
}

impl From<Vec<EpisodeResult>> for EpisodeResults {
    fn from(episodes: Vec<EpisodeResult>) -> Self {
        Self::new(episodes)
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}
