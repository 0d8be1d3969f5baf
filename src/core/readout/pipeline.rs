use super::config::{ExtractionConfig, ReadMode};
use super::coordinator::RegionOcrCoordinator;
use super::error::{ExtractError, FrameReadError, SinkWriteError};
use super::frame::Frame;
use super::recognizer::TextRecognizer;
use super::scheduler::{Sample, SampleScheduler};
use super::sink::ResultSink;
use super::source::FrameSource;
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;

/// 单次运行汇总
#[derive(Debug, Default)]
pub struct RunReport {
    pub samples_processed: usize,
    pub skipped_frames: Vec<u64>,
    pub timeouts: usize,
    pub recognition_errors: usize,
    pub written_files: Vec<PathBuf>,
    pub write_failures: Vec<(usize, SinkWriteError)>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.skipped_frames.is_empty()
            && self.timeouts == 0
            && self.recognition_errors == 0
            && self.write_failures.is_empty()
    }
}

/// 读数提取流水线 - 采样、读帧、并发识别、汇总
pub struct ReadoutPipeline {
    config: ExtractionConfig,
    recognizer: Arc<dyn TextRecognizer>,
}

impl ReadoutPipeline {
    pub fn new(config: ExtractionConfig, recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self { config, recognizer }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// 完整运行并写出每区域 CSV，只有配置错误会中止
    pub fn run<S: FrameSource + ?Sized>(&self, source: &mut S) -> Result<RunReport, ExtractError> {
        let (sink, mut report) = self.extract(source)?;

        let sink_report = sink.finalize();
        report.written_files = sink_report.written;
        report.write_failures = sink_report.failures;

        info!(
            "✅ Run complete: {} samples, {} skipped frames, {} timeouts, {} recognition errors, {}/{} files written",
            report.samples_processed,
            report.skipped_frames.len(),
            report.timeouts,
            report.recognition_errors,
            report.written_files.len(),
            sink.region_count()
        );
        Ok(report)
    }

    /// 只收集各区域时间序列，不写文件
    pub fn extract<S: FrameSource + ?Sized>(
        &self,
        source: &mut S,
    ) -> Result<(ResultSink, RunReport), ExtractError> {
        self.config.validate()?;
        let timeout = self.config.timeout().ok_or_else(|| {
            ExtractError::InvalidConfiguration("timeout_secs must be positive".to_string())
        })?;

        let total_frames = source.frame_count();
        let scheduler =
            SampleScheduler::new(total_frames, source.frame_rate(), self.config.interval_secs)?;
        let coordinator = RegionOcrCoordinator::new(
            self.config.regions.clone(),
            Arc::clone(&self.recognizer),
            timeout,
        )?;
        let (width, height) = source.dimensions();
        coordinator.check_frame_bounds(width, height)?;

        info!(
            "🎬 Extracting {} regions from {} frames @ {} fps: every {} frames, OCR timeout {:?}",
            coordinator.region_count(),
            total_frames,
            source.frame_rate(),
            scheduler.step(),
            timeout
        );

        let mut sink = ResultSink::new(coordinator.region_count(), self.config.output_prefix.clone());
        let mut report = RunReport::default();

        for sample in scheduler {
            info!(
                "Processing frame {} of {} ({:.2}% completed)",
                sample.frame_index,
                total_frames,
                sample.frame_index as f64 / total_frames as f64 * 100.0
            );

            let frame = match self.read_sample(source, &sample) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("⚠️ Skipping sample at {}s: {}", sample.timestamp, e);
                    report.skipped_frames.push(sample.frame_index);
                    continue;
                }
            };

            let results = coordinator.process(&frame);
            report.timeouts += results.iter().filter(|r| r.is_timed_out()).count();
            report.recognition_errors += results
                .iter()
                .filter(|r| r.is_recognition_error())
                .count();
            sink.append_sample(sample.timestamp, results)?;
            report.samples_processed += 1;
        }

        Ok((sink, report))
    }

    fn read_sample<S: FrameSource + ?Sized>(
        &self,
        source: &mut S,
        sample: &Sample,
    ) -> Result<Frame, FrameReadError> {
        match self.config.read_mode {
            ReadMode::Seek => source.frame_at(sample.frame_index),
            ReadMode::Sequential => Self::read_forward_to(source, sample.frame_index),
        }
    }

    /// 顺序读到 index，未采样帧的解码错误忽略
    fn read_forward_to<S: FrameSource + ?Sized>(
        source: &mut S,
        index: u64,
    ) -> Result<Frame, FrameReadError> {
        let frame_count = source.frame_count();
        loop {
            match source.next_frame() {
                None => {
                    return Err(FrameReadError::OutOfRange { index, frame_count });
                }
                Some(Ok(frame)) if frame.frame_number == index => return Ok(frame),
                Some(Ok(frame)) if frame.frame_number > index => {
                    return Err(FrameReadError::Decode {
                        index,
                        reason: format!("stream jumped to frame {}", frame.frame_number),
                    });
                }
                Some(Ok(_)) => {}
                Some(Err(FrameReadError::Decode { index: bad, .. })) if bad < index => {
                    debug!("Ignoring undecodable intermediate frame {}", bad);
                }
                Some(Err(e)) => return Err(e),
            }
        }
    }
}
