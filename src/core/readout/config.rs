use super::error::ExtractError;
use super::frame::Region;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 读帧方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadMode {
    /// 直接定位到每个采样帧
    #[default]
    Seek,
    /// 顺序解码全部帧，只保留采样帧，适用于定位慢或不准的来源
    Sequential,
}

/// 提取配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub regions: Vec<Region>,
    pub interval_secs: f64,
    pub timeout_secs: f64,
    pub output_prefix: String,
    pub read_mode: ReadMode,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            regions: Vec::new(),
            interval_secs: 5.0,
            timeout_secs: 5.0,
            output_prefix: "./table/extracted_numbers_".to_string(),
            read_mode: ReadMode::Seek,
        }
    }
}

impl ExtractionConfig {
    pub fn with_regions(regions: Vec<Region>) -> Self {
        Self {
            regions,
            ..Default::default()
        }
    }

    /// 解析 JSON5 配置，例如
    ///
    /// ```json5
    /// {
    ///   regions: [[2630, 1522, 100, 38], { x: 2150, y: 1640, width: 100, height: 38 }],
    ///   interval_secs: 5,
    ///   timeout_secs: 5,
    ///   output_prefix: "./table/extracted_numbers_",
    /// }
    /// ```
    pub fn from_json5_str(text: &str) -> Result<Self, ExtractError> {
        let config: ExtractionConfig = json5::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ExtractError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json5_str(&text)
    }

    pub fn validate(&self) -> Result<(), ExtractError> {
        if self.regions.is_empty() {
            return Err(invalid("at least one region is required"));
        }
        if let Some(index) = self.regions.iter().position(Region::is_empty) {
            return Err(invalid(format!(
                "region {} has an empty rectangle {:?}",
                index, self.regions[index]
            )));
        }
        if !(self.interval_secs.is_finite() && self.interval_secs > 0.0) {
            return Err(invalid(format!(
                "interval_secs must be positive, got {}",
                self.interval_secs
            )));
        }
        if self.timeout().is_none() {
            return Err(invalid(format!(
                "timeout_secs must be positive, got {}",
                self.timeout_secs
            )));
        }
        if self.output_prefix.is_empty() {
            return Err(invalid("output_prefix must not be empty"));
        }
        Ok(())
    }

    /// 单区域 OCR 超时，timeout_secs 不可用时返回 None
    pub fn timeout(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.timeout_secs)
            .ok()
            .filter(|t| !t.is_zero())
    }
}

fn invalid(msg: impl Into<String>) -> ExtractError {
    ExtractError::InvalidConfiguration(msg.into())
}
