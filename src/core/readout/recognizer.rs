use super::error::RecognitionError;
use super::frame::RegionCrop;
use image::ImageOutputFormat;
use log::debug;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// OCR 引擎抽象 - 可能很慢或卡死，由调用方限制等待时间
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, crop: &RegionCrop) -> Result<String, RecognitionError>;
}

type Pattern = Box<dyn Fn(&RegionCrop) -> Result<String, RecognitionError> + Send + Sync>;

pub struct MockRecognizer {
    // 按区域/帧号模拟识别结果
    pattern: Option<Pattern>,
}

impl MockRecognizer {
    pub fn new() -> Self {
        Self { pattern: None }
    }

    pub fn with_pattern<F>(pattern: F) -> Self
    where
        F: Fn(&RegionCrop) -> Result<String, RecognitionError> + Send + Sync + 'static,
    {
        Self {
            pattern: Some(Box::new(pattern)),
        }
    }

    pub fn with_fixed_text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::with_pattern(move |_| Ok(text.clone()))
    }
}

impl Default for MockRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextRecognizer for MockRecognizer {
    fn recognize(&self, crop: &RegionCrop) -> Result<String, RecognitionError> {
        self.pattern
            .as_ref()
            .map(|p| p(crop))
            .unwrap_or_else(|| Ok(String::new()))
    }
}

/// tesseract 命令行识别器 - 裁剪图以 PNG 写入 stdin，从 stdout 读回文本
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    binary: PathBuf,
    language: String,
    page_segmentation_mode: Option<u8>,
}

impl TesseractRecognizer {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            page_segmentation_mode: None,
        }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// `--psm` 参数，例如 7 表示单行文本
    pub fn with_page_segmentation_mode(mut self, psm: u8) -> Self {
        self.page_segmentation_mode = Some(psm);
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("stdin").arg("stdout").arg("-l").arg(&self.language);
        if let Some(psm) = self.page_segmentation_mode {
            cmd.arg("--psm").arg(psm.to_string());
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    fn encode_png(crop: &RegionCrop) -> Result<Vec<u8>, RecognitionError> {
        let mut buffer = Cursor::new(Vec::new());
        crop.image
            .write_to(&mut buffer, ImageOutputFormat::Png)
            .map_err(|e| RecognitionError::InvalidImage(e.to_string()))?;
        Ok(buffer.into_inner())
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, crop: &RegionCrop) -> Result<String, RecognitionError> {
        let png = Self::encode_png(crop)?;

        let mut child = self.command().spawn().map_err(|e| {
            RecognitionError::Engine(format!("failed to launch {}: {}", self.binary.display(), e))
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&png)
                .map_err(|e| RecognitionError::Engine(format!("failed to send image: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| RecognitionError::Engine(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecognitionError::Engine(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(
            "Region {} frame {} recognized: {:?}",
            crop.region_index,
            crop.frame_number,
            text.trim()
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn crop(region_index: usize, frame_number: u64) -> RegionCrop {
        RegionCrop {
            region_index,
            frame_number,
            image: RgbaImage::new(4, 4),
        }
    }

    #[test]
    fn test_mock_recognizer_with_pattern() {
        let recognizer = MockRecognizer::with_pattern(|c| {
            if c.region_index == 1 {
                Err(RecognitionError::Engine("boom".to_string()))
            } else {
                Ok(format!("r{} f{}", c.region_index, c.frame_number))
            }
        });

        assert_eq!(recognizer.recognize(&crop(0, 5)).unwrap(), "r0 f5");
        assert!(recognizer.recognize(&crop(1, 5)).is_err());
    }

    #[test]
    fn test_mock_recognizer_defaults_to_empty_text() {
        assert_eq!(MockRecognizer::new().recognize(&crop(0, 0)).unwrap(), "");
        assert_eq!(
            MockRecognizer::with_fixed_text("42").recognize(&crop(3, 9)).unwrap(),
            "42"
        );
    }

    #[test]
    fn test_tesseract_missing_binary_is_engine_error() {
        let recognizer =
            TesseractRecognizer::new().with_binary("/nonexistent/readout-tesseract-binary");

        match recognizer.recognize(&crop(0, 0)) {
            Err(RecognitionError::Engine(msg)) => assert!(msg.contains("failed to launch")),
            other => panic!("expected engine error, got {:?}", other),
        }
    }

    #[test]
    fn test_tesseract_command_arguments() {
        let recognizer = TesseractRecognizer::new()
            .with_language("deu")
            .with_page_segmentation_mode(7);
        let cmd = recognizer.command();
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(args, vec!["stdin", "stdout", "-l", "deu", "--psm", "7"]);
    }
}
