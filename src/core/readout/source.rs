//! 帧来源 - 视频解码器抽象

use super::error::{ExtractError, FrameReadError};
use super::frame::Frame;
use image::RgbaImage;
use log::{debug, info};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// 视频解码器 - 支持随机访问和顺序读取，只由驱动循环持有，不与 OCR 任务共享
pub trait FrameSource {
    fn frame_count(&self) -> u64;

    fn frame_rate(&self) -> f64;

    /// 帧宽高（像素）
    fn dimensions(&self) -> (u32, u32);

    /// 定位到 index 并解码该帧
    fn frame_at(&mut self, index: u64) -> Result<Frame, FrameReadError>;

    /// 解码下一帧，读完返回 None
    fn next_frame(&mut self) -> Option<Result<Frame, FrameReadError>>;
}

type Painter = Box<dyn Fn(u64, &mut RgbaImage) + Send>;

/// 内存合成视频，可按帧号绘制内容
pub struct MemoryVideo {
    width: u32,
    height: u32,
    frame_rate: f64,
    frame_count: u64,
    painter: Option<Painter>,
    broken_frames: HashSet<u64>,
    position: u64,
}

impl MemoryVideo {
    pub fn new(width: u32, height: u32, frame_rate: f64, frame_count: u64) -> Self {
        Self {
            width,
            height,
            frame_rate,
            frame_count,
            painter: None,
            broken_frames: HashSet::new(),
            position: 0,
        }
    }

    pub fn with_painter<F>(mut self, painter: F) -> Self
    where
        F: Fn(u64, &mut RgbaImage) + Send + 'static,
    {
        self.painter = Some(Box::new(painter));
        self
    }

    /// 指定解码失败的帧
    pub fn with_broken_frames(mut self, frames: impl IntoIterator<Item = u64>) -> Self {
        self.broken_frames.extend(frames);
        self
    }

    fn render(&self, index: u64) -> Result<Frame, FrameReadError> {
        if index >= self.frame_count {
            return Err(FrameReadError::OutOfRange {
                index,
                frame_count: self.frame_count,
            });
        }
        if self.broken_frames.contains(&index) {
            return Err(FrameReadError::Decode {
                index,
                reason: "corrupt frame".to_string(),
            });
        }

        let mut image = RgbaImage::from_pixel(self.width, self.height, image::Rgba([0, 0, 0, 255]));
        if let Some(painter) = &self.painter {
            painter(index, &mut image);
        }
        Ok(Frame::from_image(image, index))
    }
}

impl FrameSource for MemoryVideo {
    fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn frame_at(&mut self, index: u64) -> Result<Frame, FrameReadError> {
        self.position = index.saturating_add(1);
        self.render(index)
    }

    fn next_frame(&mut self) -> Option<Result<Frame, FrameReadError>> {
        if self.position >= self.frame_count {
            return None;
        }
        let index = self.position;
        self.position += 1;
        Some(self.render(index))
    }
}

const FRAME_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// 图片序列视频 - 目录中的静态帧按文件名排序，按指定帧率播放
pub struct ImageSequence {
    frames: Vec<PathBuf>,
    frame_rate: f64,
    dimensions: (u32, u32),
    position: u64,
}

impl ImageSequence {
    pub fn open(dir: impl AsRef<Path>, frame_rate: f64) -> Result<Self, ExtractError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| unusable_video(dir, e))?;

        let mut frames = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_frame = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_frame {
                frames.push(path);
            }
        }
        frames.sort();

        let first = frames
            .first()
            .ok_or_else(|| unusable_video(dir, "no frame images found"))?;
        let dimensions = image::image_dimensions(first).map_err(|e| unusable_video(first, e))?;

        info!(
            "🎬 Opened image sequence {}: {} frames, {}x{} @ {} fps",
            dir.display(),
            frames.len(),
            dimensions.0,
            dimensions.1,
            frame_rate
        );

        Ok(Self {
            frames,
            frame_rate,
            dimensions,
            position: 0,
        })
    }

    fn decode(&self, index: u64) -> Result<Frame, FrameReadError> {
        let path = usize::try_from(index)
            .ok()
            .and_then(|i| self.frames.get(i))
            .ok_or(FrameReadError::OutOfRange {
                index,
                frame_count: self.frames.len() as u64,
            })?;

        debug!("Decoding frame {} from {}", index, path.display());
        let image = image::open(path).map_err(|e| FrameReadError::Decode {
            index,
            reason: e.to_string(),
        })?;
        Ok(Frame::from_image(image.to_rgba8(), index))
    }
}

impl FrameSource for ImageSequence {
    fn frame_count(&self) -> u64 {
        self.frames.len() as u64
    }

    fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    fn frame_at(&mut self, index: u64) -> Result<Frame, FrameReadError> {
        self.position = index.saturating_add(1);
        self.decode(index)
    }

    fn next_frame(&mut self) -> Option<Result<Frame, FrameReadError>> {
        if self.position >= self.frame_count() {
            return None;
        }
        let index = self.position;
        self.position += 1;
        Some(self.decode(index))
    }
}

/// 视频无法打开属于配置错误
fn unusable_video(path: &Path, reason: impl std::fmt::Display) -> ExtractError {
    ExtractError::InvalidConfiguration(format!("cannot open video {}: {}", path.display(), reason))
}
