use super::error::ExtractError;
use std::iter::FusedIterator;

/// 采样点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub frame_index: u64,
    /// 距视频开头的秒数
    pub timestamp: f64,
}

/// 采样调度器 - 产出小于总帧数的 `0, s, 2s, ...`，
/// 其中 `s = round(frame_rate * interval_secs)`，只能消费一次
#[derive(Debug, Clone)]
pub struct SampleScheduler {
    step: u64,
    frame_rate: f64,
    total_frames: u64,
    next_index: u64,
}

impl SampleScheduler {
    pub fn new(total_frames: u64, frame_rate: f64, interval_secs: f64) -> Result<Self, ExtractError> {
        let raw_step = (frame_rate * interval_secs).round();
        if !raw_step.is_finite() || raw_step < 1.0 {
            return Err(ExtractError::InvalidConfiguration(format!(
                "sampling step must be positive (frame rate {} x interval {}s = {})",
                frame_rate, interval_secs, raw_step
            )));
        }

        Ok(Self {
            // 浮点转整数会饱和截断
            step: raw_step as u64,
            frame_rate,
            total_frames,
            next_index: 0,
        })
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    /// 从头开始的采样总数
    pub fn sample_count(&self) -> u64 {
        self.total_frames.div_ceil(self.step)
    }
}

impl Iterator for SampleScheduler {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        if self.next_index >= self.total_frames {
            return None;
        }
        let frame_index = self.next_index;
        self.next_index = frame_index.saturating_add(self.step);

        Some(Sample {
            frame_index,
            timestamp: frame_index as f64 / self.frame_rate,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .total_frames
            .saturating_sub(self.next_index)
            .div_ceil(self.step);
        let remaining = usize::try_from(remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl FusedIterator for SampleScheduler {}
