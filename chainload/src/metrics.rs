//! Aggregates over attack results and over the chain's block production.
use crate::rpc::BlockHeader;
use chainload_core::AttackResult;
use pdatastructs::tdigest::{TDigest, K1};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use time::OffsetDateTime;

const TDIGEST_BACKLOG_SIZE: usize = 100;

pub const REPORTED_QUANTILES: [(&str, f64); 4] =
    [("50th", 0.5), ("90th", 0.9), ("95th", 0.95), ("99th", 0.99)];

/// Running aggregate over a stream of [`AttackResult`]s. Append only.
#[derive(Debug, Clone)]
pub struct Metrics {
    requests: u64,
    success: u64,
    latencies: TDigest<K1>,
    total_latency: Duration,
    max_latency: Duration,
    bytes_in: u64,
    bytes_out: u64,
    status_codes: BTreeMap<u16, u64>,
    errors: BTreeSet<String>,
    earliest: Option<OffsetDateTime>,
    latest: Option<OffsetDateTime>,
    end: Option<OffsetDateTime>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            requests: 0,
            success: 0,
            latencies: default_tdigest(),
            total_latency: Duration::ZERO,
            max_latency: Duration::ZERO,
            bytes_in: 0,
            bytes_out: 0,
            status_codes: BTreeMap::new(),
            errors: BTreeSet::new(),
            earliest: None,
            latest: None,
            end: None,
        }
    }

    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a AttackResult>) -> Self {
        let mut metrics = Self::new();
        for result in results {
            metrics.add(result);
        }
        metrics
    }

    pub fn add(&mut self, result: &AttackResult) {
        self.requests += 1;
        if result.is_success() {
            self.success += 1;
        }

        self.latencies.insert(result.latency.as_secs_f64());
        self.total_latency += result.latency;
        self.max_latency = self.max_latency.max(result.latency);

        self.bytes_in += result.bytes_in;
        self.bytes_out += result.bytes_out;
        *self.status_codes.entry(result.status_code).or_default() += 1;
        if !result.error.is_empty() {
            self.errors.insert(result.error.clone());
        }

        let end = result.end();
        self.earliest = Some(self.earliest.map_or(result.timestamp, |t| t.min(result.timestamp)));
        self.latest = Some(self.latest.map_or(result.timestamp, |t| t.max(result.timestamp)));
        self.end = Some(self.end.map_or(end, |t| t.max(end)));
    }

    pub fn requests(&self) -> u64 {
        self.requests
    }

    pub fn success(&self) -> u64 {
        self.success
    }

    pub fn bytes_in(&self) -> u64 {
        self.bytes_in
    }

    pub fn bytes_out(&self) -> u64 {
        self.bytes_out
    }

    pub fn status_codes(&self) -> &BTreeMap<u16, u64> {
        &self.status_codes
    }

    pub fn errors(&self) -> &BTreeSet<String> {
        &self.errors
    }

    pub fn earliest(&self) -> Option<OffsetDateTime> {
        self.earliest
    }

    pub fn end(&self) -> Option<OffsetDateTime> {
        self.end
    }

    /// Time between the first and the last request being issued.
    pub fn duration(&self) -> Duration {
        match (self.earliest, self.latest) {
            (Some(earliest), Some(latest)) => unsigned(latest - earliest),
            _ => Duration::ZERO,
        }
    }

    /// Time between the last request being issued and the last response arriving.
    pub fn wait(&self) -> Duration {
        match (self.latest, self.end) {
            (Some(latest), Some(end)) => unsigned(end - latest),
            _ => Duration::ZERO,
        }
    }

    /// Requests issued per second.
    pub fn rate(&self) -> f64 {
        per_sec(self.requests, self.duration())
    }

    /// Successful requests completed per second.
    pub fn throughput(&self) -> f64 {
        per_sec(self.success, self.duration() + self.wait())
    }

    pub fn success_ratio(&self) -> f64 {
        if self.requests == 0 {
            return 0.;
        }
        self.success as f64 / self.requests as f64
    }

    pub fn latency(&self, quantile: f64) -> Duration {
        let secs = self.latencies.quantile(quantile);
        if secs.is_nan() {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(secs.max(0.))
    }

    pub fn mean_latency(&self) -> Duration {
        if self.requests == 0 {
            return Duration::ZERO;
        }
        self.total_latency.div_f64(self.requests as f64)
    }

    pub fn max_latency(&self) -> Duration {
        self.max_latency
    }

    pub fn mean_bytes_in(&self) -> f64 {
        mean(self.bytes_in, self.requests)
    }

    pub fn mean_bytes_out(&self) -> f64 {
        mean(self.bytes_out, self.requests)
    }
}

fn default_tdigest() -> TDigest<K1> {
    TDigest::new(K1::new(10.), TDIGEST_BACKLOG_SIZE)
}

fn unsigned(d: time::Duration) -> Duration {
    Duration::try_from(d).unwrap_or(Duration::ZERO)
}

fn per_sec(count: u64, over: Duration) -> f64 {
    if over.is_zero() {
        return 0.;
    }
    count as f64 / over.as_secs_f64()
}

fn mean(total: u64, count: u64) -> f64 {
    if count == 0 {
        return 0.;
    }
    total as f64 / count as f64
}

/// Block production between one block and the one before it.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSample {
    pub height: u64,
    pub tx_count: u64,
    pub interval: Duration,
    pub tps: f64,
}

/// One sample per header that has a predecessor in `headers`. Headers must be consecutive and in
/// height order.
pub fn block_samples(headers: &[BlockHeader]) -> Vec<BlockSample> {
    headers
        .windows(2)
        .map(|pair| {
            let interval = unsigned(pair[1].time - pair[0].time);
            BlockSample {
                height: pair[1].height,
                tx_count: pair[1].num_txs,
                interval,
                tps: per_sec(pair[1].num_txs, interval),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BlockStats {
    pub blocks: usize,
    pub txs: u64,
    pub mean_tps: f64,
    pub stddev_tps: f64,
    pub mean_interval: Duration,
    pub stddev_interval: Duration,
}

impl BlockStats {
    pub fn from_samples(samples: &[BlockSample]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let tps: Vec<f64> = samples.iter().map(|s| s.tps).collect();
        let intervals: Vec<f64> = samples.iter().map(|s| s.interval.as_secs_f64()).collect();

        Self {
            blocks: samples.len(),
            txs: samples.iter().map(|s| s.tx_count).sum(),
            mean_tps: statistical::mean(&tps),
            stddev_tps: stddev(&tps),
            mean_interval: Duration::from_secs_f64(statistical::mean(&intervals)),
            stddev_interval: Duration::from_secs_f64(stddev(&intervals)),
        }
    }
}

// Sample standard deviation is undefined below two values.
fn stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.;
    }
    statistical::standard_deviation(values, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_700_000_000 + secs).unwrap()
    }

    fn result(secs: i64, latency_ms: u64, status_code: u16) -> AttackResult {
        AttackResult {
            attack: "test".to_string(),
            seq: 0,
            timestamp: at(secs),
            latency: Duration::from_millis(latency_ms),
            status_code,
            body: String::new(),
            bytes_in: 10,
            bytes_out: 20,
            error: if status_code == 200 {
                String::new()
            } else {
                "500 Internal Server Error".to_string()
            },
        }
    }

    #[test]
    fn aggregates_results() {
        let results = [
            result(0, 100, 200),
            result(1, 300, 200),
            result(2, 200, 500),
            result(4, 400, 200),
        ];
        let metrics = Metrics::from_results(&results);

        assert_eq!(metrics.requests(), 4);
        assert_eq!(metrics.success(), 3);
        assert_eq!(metrics.success_ratio(), 0.75);
        assert_eq!(metrics.duration(), Duration::from_secs(4));
        assert_eq!(metrics.wait(), Duration::from_millis(400));
        assert_eq!(metrics.rate(), 1.);
        assert_eq!(metrics.mean_latency(), Duration::from_millis(250));
        assert_eq!(metrics.max_latency(), Duration::from_millis(400));
        assert_eq!(metrics.bytes_in(), 40);
        assert_eq!(metrics.mean_bytes_out(), 20.);
        assert_eq!(metrics.status_codes()[&200], 3);
        assert_eq!(metrics.errors().len(), 1);

        let p50 = metrics.latency(0.5);
        assert!(p50 >= Duration::from_millis(100) && p50 <= Duration::from_millis(400));
    }

    #[test]
    fn empty_metrics_are_zero() {
        let metrics = Metrics::new();
        assert_eq!(metrics.latency(0.99), Duration::ZERO);
        assert_eq!(metrics.rate(), 0.);
        assert_eq!(metrics.throughput(), 0.);
        assert_eq!(metrics.mean_latency(), Duration::ZERO);
    }

    #[test]
    fn samples_consecutive_blocks() {
        let headers: Vec<_> = [(1, 0, 0), (2, 2, 4), (3, 3, 9)]
            .into_iter()
            .map(|(height, secs, num_txs)| BlockHeader {
                height,
                time: at(secs),
                num_txs,
            })
            .collect();

        let samples = block_samples(&headers);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].height, 2);
        assert_eq!(samples[0].interval, Duration::from_secs(2));
        assert_eq!(samples[0].tps, 2.);
        assert_eq!(samples[1].tps, 9.);

        let stats = BlockStats::from_samples(&samples);
        assert_eq!(stats.blocks, 2);
        assert_eq!(stats.txs, 13);
        assert_eq!(stats.mean_tps, 5.5);
        assert_eq!(stats.mean_interval, Duration::from_millis(1500));
        assert!(stats.stddev_tps > 0.);
    }

    #[test]
    fn single_sample_has_no_spread() {
        let samples = [BlockSample {
            height: 2,
            tx_count: 1,
            interval: Duration::from_secs(1),
            tps: 1.,
        }];
        let stats = BlockStats::from_samples(&samples);
        assert_eq!(stats.stddev_tps, 0.);
        assert_eq!(stats.mean_tps, 1.);
    }
}
