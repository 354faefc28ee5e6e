use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::masku::counters::MaskUnitCounters;
use crate::traffic::sequencer::CompletionRecord;

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct LatencySummary {
    pub count: u64,
    pub min: u64,
    pub max: u64,
    pub mean: f64,
}

impl LatencySummary {
    pub fn from_records(records: &[CompletionRecord]) -> Self {
        let latencies: Vec<u64> = records.iter().map(CompletionRecord::latency).collect();
        let count = latencies.len() as u64;
        if count == 0 {
            return Self::default();
        }
        let sum: u64 = latencies.iter().sum();
        Self {
            count,
            min: latencies.iter().copied().min().unwrap_or(0),
            max: latencies.iter().copied().max().unwrap_or(0),
            mean: sum as f64 / count as f64,
        }
    }
}

/// Everything a run reports.
#[derive(Debug, Clone, Serialize)]
pub struct SimSummary {
    pub cycles: u64,
    pub completed: usize,
    pub dropped: usize,
    pub bundles_delivered: u64,
    pub bytes_strobed: u64,
    pub queue_utilization: f64,
    pub latency: LatencySummary,
    pub masku: MaskUnitCounters,
    pub completions: Vec<CompletionRecord>,
}

impl SimSummary {
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("cannot create {}", dir.display()))?;
        }
        let payload = serde_json::to_string_pretty(self)?;
        fs::write(path, payload).with_context(|| format!("cannot write {}", path.display()))
    }
}
