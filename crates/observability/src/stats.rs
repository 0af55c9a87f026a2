//! End-of-run throughput statistics
//!
//! Kept in memory by whoever drives a stream (recorder, demos) and printed
//! once the run stops. Nothing here touches the metrics recorder.

use std::fmt;

use contracts::{Packet, TICKS_PER_SECOND};

/// Streaming mean/variance (Welford) plus extrema
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningStats {
    n: u64,
    mean: f64,
    sum_sq_dev: f64,
    range: Option<(f64, f64)>,
}

impl RunningStats {
    pub fn push(&mut self, sample: f64) {
        self.n += 1;
        let delta = sample - self.mean;
        self.mean += delta / self.n as f64;
        self.sum_sq_dev += delta * (sample - self.mean);
        self.range = Some(match self.range {
            Some((lo, hi)) => (lo.min(sample), hi.max(sample)),
            None => (sample, sample),
        });
    }

    pub fn count(&self) -> u64 {
        self.n
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance, `0.0` below two samples
    pub fn variance(&self) -> f64 {
        match self.n {
            0 | 1 => 0.0,
            n => self.sum_sq_dev / (n - 1) as f64,
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.range.map_or(0.0, |(lo, _)| lo)
    }

    pub fn max(&self) -> f64 {
        self.range.map_or(0.0, |(_, hi)| hi)
    }
}

/// Frozen view of a [`RunningStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsSummary {
    pub count: u64,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
            min: stats.min(),
            max: stats.max(),
        }
    }
}

impl fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.count {
            0 => f.write_str("n/a"),
            n => write!(
                f,
                "{:.2} ± {:.2} [{:.2}, {:.2}] over {n}",
                self.mean, self.std_dev, self.min, self.max
            ),
        }
    }
}

/// Per-stream packet accounting
///
/// Inter-packet intervals come from device timestamps (100 ns ticks), not
/// from arrival time, so they describe the sensor rather than the relay.
#[derive(Debug, Clone, Default)]
pub struct ThroughputAggregator {
    packets: u64,
    payload_total: u64,
    payload_size: RunningStats,
    interval_ms: RunningStats,
    previous: Option<u64>,
    out_of_order: u64,
}

impl ThroughputAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one packet
    pub fn observe(&mut self, packet: &Packet) {
        let len = packet.payload.len() as u64;
        self.packets += 1;
        self.payload_total += len;
        self.payload_size.push(len as f64);

        match self.previous {
            Some(prev) if packet.timestamp >= prev => {
                let ticks = packet.timestamp - prev;
                self.interval_ms
                    .push(ticks as f64 * 1_000.0 / TICKS_PER_SECOND as f64);
            }
            Some(_) => self.out_of_order += 1,
            None => {}
        }
        self.previous = Some(packet.timestamp);
    }

    pub fn packets(&self) -> u64 {
        self.packets
    }

    pub fn summary(&self) -> ThroughputSummary {
        ThroughputSummary {
            packets: self.packets,
            payload_bytes: self.payload_total,
            out_of_order: self.out_of_order,
            payload_size: (&self.payload_size).into(),
            interval_ms: (&self.interval_ms).into(),
        }
    }
}

/// Snapshot of a [`ThroughputAggregator`]
#[derive(Debug, Clone, Default)]
pub struct ThroughputSummary {
    pub packets: u64,
    pub payload_bytes: u64,
    /// Packets whose timestamp went backwards
    pub out_of_order: u64,
    pub payload_size: StatsSummary,
    pub interval_ms: StatsSummary,
}

impl fmt::Display for ThroughputSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} packets, {} payload bytes, {} out of order",
            self.packets, self.payload_bytes, self.out_of_order
        )?;
        writeln!(f, "  payload bytes/packet: {}", self.payload_size)?;
        write!(f, "  interval ms:          {}", self.interval_ms)
    }
}
