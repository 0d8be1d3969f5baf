use std::path::PathBuf;
use thiserror::Error;

/// 致命错误，在处理任何采样前返回
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config parse error: {0}")]
    ConfigFormat(#[from] json5::Error),
}

/// 帧读取错误，跳过该采样
#[derive(Debug, Error)]
pub enum FrameReadError {
    #[error("Frame {index} is out of range (frame count {frame_count})")]
    OutOfRange { index: u64, frame_count: u64 },
    #[error("Failed to decode frame {index}: {reason}")]
    Decode { index: u64, reason: String },
}

/// 单区域识别错误，可克隆以存入 RegionResult
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecognitionError {
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("Invalid crop: {0}")]
    InvalidImage(String),
    #[error("Failed to start OCR task: {0}")]
    Spawn(String),
}

/// 单个区域文件写入错误
#[derive(Debug, Error)]
pub enum SinkWriteError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SinkWriteError {
    pub fn path(&self) -> &PathBuf {
        match self {
            SinkWriteError::Io { path, .. } => path,
        }
    }
}
