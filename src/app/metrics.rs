use rand::Rng;
use serde::Serialize;

const HISTORY_LEN: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct MetricSeries {
    pub current: u32,
    pub history: Vec<u32>,
}

/// Live gauge snapshot attached to the system-health section. Values are
/// synthesized around per-gauge baselines until real collectors are wired in.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub cpu: MetricSeries,
    pub memory: MetricSeries,
    pub disk: MetricSeries,
    pub network: MetricSeries,
}

#[derive(Clone, Default)]
pub struct MetricsSource;

impl MetricsSource {
    pub fn new() -> Self {
        Self
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cpu: gauge(45),
            memory: gauge(62),
            disk: gauge(73),
            network: gauge(38),
        }
    }
}

fn gauge(baseline: u32) -> MetricSeries {
    let mut rng = rand::thread_rng();
    let history: Vec<u32> = (0..HISTORY_LEN)
        .map(|_| jitter(baseline, &mut rng))
        .collect();
    let current = *history.last().unwrap_or(&baseline);
    MetricSeries { current, history }
}

fn jitter(baseline: u32, rng: &mut impl Rng) -> u32 {
    let delta = rng.gen_range(-5i64..=5);
    (baseline as i64 + delta).clamp(0, 100) as u32
}
