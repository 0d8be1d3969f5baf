//! 仪表读数提取器

use crate::api::models::readout::RunSummary;
use crate::core::readout::{
    ExtractError, ExtractionConfig, FrameSource, ImageSequence, ReadoutPipeline, RunReport,
    TesseractRecognizer, TextRecognizer,
};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// 读数提取 API 错误类型，跨语言友好的设计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadoutApiError {
    pub error_type: String,
    pub message: String,
}

impl From<ExtractError> for ReadoutApiError {
    fn from(e: ExtractError) -> Self {
        let error_type = match &e {
            ExtractError::InvalidConfiguration(_) => "InvalidConfiguration",
            ExtractError::Io(_) => "Io",
            ExtractError::ConfigFormat(_) => "ConfigFormat",
        };
        Self {
            error_type: error_type.to_string(),
            message: e.to_string(),
        }
    }
}

impl std::fmt::Display for ReadoutApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.error_type, self.message)
    }
}

impl std::error::Error for ReadoutApiError {}

impl From<RunReport> for RunSummary {
    fn from(report: RunReport) -> Self {
        Self {
            samples_processed: report.samples_processed as u64,
            skipped_frames: report.skipped_frames,
            timeouts: report.timeouts as u64,
            recognition_errors: report.recognition_errors as u64,
            written_files: report
                .written_files
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            write_failures: report
                .write_failures
                .iter()
                .map(|(_, e)| e.to_string())
                .collect(),
        }
    }
}

/// 读数提取器 - 按区域并发 OCR，输出每区域 CSV
///
/// ```ignore
/// let extractor = ReadoutExtractor::from_config_file("readout.json5")?;
/// let summary = extractor.run_image_sequence("./data/frames", 30.0)?;
/// println!("{} samples", summary.samples_processed);
/// ```
pub struct ReadoutExtractor {
    pipeline: ReadoutPipeline,
}

impl ReadoutExtractor {
    /// 使用自定义识别引擎创建
    pub fn create(
        config: ExtractionConfig,
        recognizer: Arc<dyn TextRecognizer>,
    ) -> Result<Self, ReadoutApiError> {
        config.validate()?;
        info!(
            "🎬 ReadoutExtractor: created ({} regions, every {}s, timeout {}s)",
            config.regions.len(),
            config.interval_secs,
            config.timeout_secs
        );
        Ok(Self {
            pipeline: ReadoutPipeline::new(config, recognizer),
        })
    }

    /// 使用本机 tesseract 创建
    pub fn with_tesseract(config: ExtractionConfig) -> Result<Self, ReadoutApiError> {
        Self::create(config, Arc::new(TesseractRecognizer::new()))
    }

    /// 从 JSON5 配置文件创建（tesseract 引擎）
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, ReadoutApiError> {
        let config = ExtractionConfig::load(path)?;
        Self::with_tesseract(config)
    }

    pub fn config(&self) -> &ExtractionConfig {
        self.pipeline.config()
    }

    /// 处理任意帧来源并写出结果
    pub fn run(&self, source: &mut dyn FrameSource) -> Result<RunSummary, ReadoutApiError> {
        let report = self.pipeline.run(source)?;
        Ok(report.into())
    }

    /// 处理图片序列目录（按文件名排序，指定帧率）
    pub fn run_image_sequence(
        &self,
        dir: impl AsRef<Path>,
        frame_rate: f64,
    ) -> Result<RunSummary, ReadoutApiError> {
        let mut source = ImageSequence::open(dir, frame_rate)?;
        self.run(&mut source)
    }
}

impl Drop for ReadoutExtractor {
    fn drop(&mut self) {
        info!("🗑️ ReadoutExtractor: released");
    }
}
