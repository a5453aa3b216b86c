//! Summaries of a finished run: client-side metrics next to what the chain produced meanwhile.
mod chart;

use crate::error::ReportError;
use crate::metrics::{block_samples, BlockSample, BlockStats, Metrics, REPORTED_QUANTILES};
use crate::rpc::RpcClient;
use chainload_core::AttackResult;
use humantime::format_duration;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn};

pub const LATENCY_CHART: &str = "latency.svg";
pub const BLOCKS_CHART: &str = "blocks.svg";
pub const SUMMARY_FILE: &str = "summary.txt";

#[derive(Debug, Clone)]
pub struct Report {
    pub metrics: Metrics,
    pub blocks: Vec<BlockSample>,
    pub block_stats: BlockStats,
}

pub struct Reporter {
    rpc: RpcClient,
    output_dir: Option<PathBuf>,
}

impl Reporter {
    pub fn new(client: reqwest::Client, target_url: &str, output_dir: Option<PathBuf>) -> Self {
        Self {
            rpc: RpcClient::new(client, target_url),
            output_dir,
        }
    }

    /// Aggregates `results` and samples blocks `from..=to`. Charts and the summary are written
    /// only when an output directory was configured.
    #[instrument(skip(self, results), fields(results = results.len()))]
    pub async fn report(
        &self,
        results: &[AttackResult],
        from: u64,
        to: u64,
    ) -> Result<Report, ReportError> {
        let metrics = Metrics::from_results(results);

        let headers = self.rpc.blocks(from, to).await?;
        let blocks = block_samples(&headers);
        let block_stats = BlockStats::from_samples(&blocks);

        let report = Report {
            metrics,
            blocks,
            block_stats,
        };

        match &self.output_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                chart::latency(&dir.join(LATENCY_CHART), results)?;
                chart::blocks(&dir.join(BLOCKS_CHART), &report.blocks)?;
                fs::write(dir.join(SUMMARY_FILE), report.to_string())?;
                info!("Report written to {}", dir.display());
            }
            None => debug!("No output directory, skipping charts"),
        }

        Ok(report)
    }
}

// Sub-millisecond precision is noise at this level.
fn round(d: Duration) -> humantime::FormattedDuration {
    let micros = d.as_micros().min(u64::MAX as u128) as u64;
    format_duration(Duration::from_micros(micros))
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.metrics;
        writeln!(
            f,
            "Requests      [total, rate, throughput]  {}, {:.2}, {:.2}",
            m.requests(),
            m.rate(),
            m.throughput()
        )?;
        writeln!(
            f,
            "Duration      [total, attack, wait]      {}, {}, {}",
            round(m.duration() + m.wait()),
            round(m.duration()),
            round(m.wait())
        )?;

        write!(f, "Latencies     [mean")?;
        for (name, _) in REPORTED_QUANTILES {
            write!(f, ", {name}")?;
        }
        write!(f, ", max]  {}", round(m.mean_latency()))?;
        for (_, q) in REPORTED_QUANTILES {
            write!(f, ", {}", round(m.latency(q)))?;
        }
        writeln!(f, ", {}", round(m.max_latency()))?;

        writeln!(
            f,
            "Bytes In      [total, mean]              {}, {:.2}",
            m.bytes_in(),
            m.mean_bytes_in()
        )?;
        writeln!(
            f,
            "Bytes Out     [total, mean]              {}, {:.2}",
            m.bytes_out(),
            m.mean_bytes_out()
        )?;
        writeln!(
            f,
            "Success       [ratio]                    {:.2}%",
            m.success_ratio() * 100.
        )?;

        write!(f, "Status Codes  [code:count]             ")?;
        for (code, count) in m.status_codes() {
            write!(f, " {code}:{count}")?;
        }
        writeln!(f)?;

        let b = &self.block_stats;
        writeln!(
            f,
            "Blocks        [count, txs]               {}, {}",
            b.blocks, b.txs
        )?;
        writeln!(
            f,
            "Block TPS     [mean, stddev]             {:.2}, {:.2}",
            b.mean_tps, b.stddev_tps
        )?;
        writeln!(
            f,
            "Block time    [mean, stddev]             {}, {}",
            round(b.mean_interval),
            round(b.stddev_interval)
        )?;

        writeln!(f, "Error Set:")?;
        for err in m.errors() {
            writeln!(f, "{err}")?;
        }
        Ok(())
    }
}
