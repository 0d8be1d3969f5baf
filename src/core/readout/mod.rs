//! 仪表读数提取 - 从视频固定区域周期性 OCR 出数字并按区域写出时间序列
//!
//! 流程：
//! 1. 采样调度 - 按固定时间间隔选帧
//! 2. 区域裁剪 - 每个配置区域裁出子图
//! 3. 并发识别 - 每区域独立 OCR 任务，单任务超时后放弃
//! 4. 结果汇总 - 每区域一个 CSV 文件

pub mod config;
pub mod coordinator;
pub mod error;
pub mod frame;
pub mod numbers;
pub mod pipeline;
pub mod recognizer;
pub mod scheduler;
pub mod sink;
pub mod source;

pub use config::{ExtractionConfig, ReadMode};
pub use coordinator::{RegionFailure, RegionOcrCoordinator, RegionResult};
pub use error::{ExtractError, FrameReadError, RecognitionError, SinkWriteError};
pub use frame::{crop_region, Frame, Region, RegionCrop};
pub use numbers::parse_numbers;
pub use pipeline::{ReadoutPipeline, RunReport};
pub use recognizer::{MockRecognizer, TesseractRecognizer, TextRecognizer};
pub use scheduler::{Sample, SampleScheduler};
pub use sink::{ResultSink, SinkReport, TimeSeries};
pub use source::{FrameSource, ImageSequence, MemoryVideo};
