//! 结果汇总 - 每个区域一条时间序列，结束时各写一个 CSV 文件

use super::coordinator::RegionResult;
use super::error::{ExtractError, SinkWriteError};
use log::{error, info};
use rayon::prelude::*;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

pub const CSV_HEADER: &str = "Time,Numbers";
const LINE_END: &str = "\r\n";

/// 单个区域的时间序列，按采样顺序只追加
#[derive(Debug, Clone, Default)]
pub struct TimeSeries {
    entries: Vec<(f64, RegionResult)>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, timestamp: f64, result: RegionResult) {
        self.entries.push((timestamp, result));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(f64, RegionResult)] {
        &self.entries
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::with_capacity(16 * (self.entries.len() + 1));
        out.push_str(CSV_HEADER);
        out.push_str(LINE_END);
        for (timestamp, result) in &self.entries {
            let _ = write!(out, "{},{}{}", format_seconds(*timestamp), result.joined(), LINE_END);
        }
        out
    }
}

/// 秒数格式化，总带小数部分：`0.0`、`5.0`、`2.5`
pub fn format_seconds(seconds: f64) -> String {
    format!("{:?}", seconds)
}

/// 输出路径：前缀 + 从 1 开始的区域号 + `.csv`
pub fn output_path(prefix: &str, region_index: usize) -> PathBuf {
    PathBuf::from(format!("{}{}.csv", prefix, region_index + 1))
}

#[derive(Debug, Default)]
pub struct SinkReport {
    pub written: Vec<PathBuf>,
    pub failures: Vec<(usize, SinkWriteError)>,
}

impl SinkReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct ResultSink {
    series: Vec<TimeSeries>,
    output_prefix: String,
}

impl ResultSink {
    pub fn new(region_count: usize, output_prefix: impl Into<String>) -> Self {
        Self {
            series: vec![TimeSeries::new(); region_count],
            output_prefix: output_prefix.into(),
        }
    }

    pub fn region_count(&self) -> usize {
        self.series.len()
    }

    pub fn series(&self, region_index: usize) -> Option<&TimeSeries> {
        self.series.get(region_index)
    }

    pub fn append(
        &mut self,
        region_index: usize,
        timestamp: f64,
        result: RegionResult,
    ) -> Result<(), ExtractError> {
        let region_count = self.series.len();
        let series = self.series.get_mut(region_index).ok_or_else(|| {
            ExtractError::InvalidConfiguration(format!(
                "region {} is not configured ({} regions)",
                region_index, region_count
            ))
        })?;
        series.push(timestamp, result);
        Ok(())
    }

    /// 追加一个采样的结果，`results[i]` 属于区域 i
    pub fn append_sample(
        &mut self,
        timestamp: f64,
        results: Vec<RegionResult>,
    ) -> Result<(), ExtractError> {
        if results.len() != self.series.len() {
            return Err(ExtractError::InvalidConfiguration(format!(
                "expected {} region results, got {}",
                self.series.len(),
                results.len()
            )));
        }
        for (series, result) in self.series.iter_mut().zip(results) {
            series.push(timestamp, result);
        }
        Ok(())
    }

    pub fn output_path(&self, region_index: usize) -> PathBuf {
        output_path(&self.output_prefix, region_index)
    }

    /// 并行写出所有区域文件，单个文件失败不影响其他文件
    pub fn finalize(&self) -> SinkReport {
        let outcomes: Vec<(usize, Result<PathBuf, SinkWriteError>)> = self
            .series
            .par_iter()
            .enumerate()
            .map(|(region_index, series)| {
                let path = self.output_path(region_index);
                (region_index, write_series(&path, series).map(|_| path))
            })
            .collect();

        let mut report = SinkReport::default();
        for (region_index, outcome) in outcomes {
            match outcome {
                Ok(path) => {
                    info!(
                        "💾 Region {}: {} rows written to {}",
                        region_index,
                        self.series[region_index].len(),
                        path.display()
                    );
                    report.written.push(path);
                }
                Err(e) => {
                    error!("❌ Region {}: {}", region_index, e);
                    report.failures.push((region_index, e));
                }
            }
        }
        report
    }
}

fn write_series(path: &Path, series: &TimeSeries) -> Result<(), SinkWriteError> {
    let wrap = |source: std::io::Error| SinkWriteError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(wrap)?;
    }
    fs::write(path, series.to_csv()).map_err(wrap)
}
