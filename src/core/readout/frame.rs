use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// 帧数据结构
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGBA 格式
    pub frame_number: u64,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>, frame_number: u64) -> Self {
        Self {
            width,
            height,
            data,
            frame_number,
        }
    }

    pub fn filled(width: u32, height: u32, rgba: [u8; 4], frame_number: u64) -> Self {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self::new(width, height, data, frame_number)
    }

    pub fn from_image(image: RgbaImage, frame_number: u64) -> Self {
        let (width, height) = image.dimensions();
        Self::new(width, height, image.into_raw(), frame_number)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// 读数区域 - 帧内固定矩形
///
/// 配置中可写作 `{ x, y, width, height }` 或 `[x, y, width, height]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RegionRepr")]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RegionRepr {
    Rect {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    Tuple(u32, u32, u32, u32),
}

impl From<RegionRepr> for Region {
    fn from(repr: RegionRepr) -> Self {
        match repr {
            RegionRepr::Rect {
                x,
                y,
                width,
                height,
            }
            | RegionRepr::Tuple(x, y, width, height) => Region::new(x, y, width, height),
        }
    }
}

impl Region {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// 右、下边界，溢出时返回 None
    fn far_edges(&self) -> Option<(u32, u32)> {
        Some((
            self.x.checked_add(self.width)?,
            self.y.checked_add(self.height)?,
        ))
    }

    pub fn fits_within(&self, frame_width: u32, frame_height: u32) -> bool {
        match self.far_edges() {
            Some((right, bottom)) => {
                !self.is_empty() && right <= frame_width && bottom <= frame_height
            }
            None => false,
        }
    }
}

/// 单个区域的裁剪结果，OCR 任务独占
#[derive(Debug, Clone)]
pub struct RegionCrop {
    pub region_index: usize,
    pub frame_number: u64,
    pub image: RgbaImage,
}

/// 区域裁剪 - 矩形越界或帧缓冲与尺寸不符时返回 None
pub fn crop_region(frame: &Frame, region: &Region) -> Option<RgbaImage> {
    if !region.fits_within(frame.width, frame.height) {
        return None;
    }
    let image = RgbaImage::from_raw(frame.width, frame.height, frame.data.clone())?;
    Some(image::imageops::crop_imm(&image, region.x, region.y, region.width, region.height).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient_frame(width: u32, height: u32) -> Frame {
        let image = RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        Frame::from_image(image, 7)
    }

    #[test]
    fn test_frame_creation() {
        let frame = Frame::filled(100, 50, [255, 255, 255, 255], 30);

        assert_eq!(frame.width, 100);
        assert_eq!(frame.height, 50);
        assert_eq!(frame.pixel_count(), 5000);
        assert_eq!(frame.data.len(), 100 * 50 * 4);
        assert_eq!(frame.frame_number, 30);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_pixel_count_beyond_u32() {
        let frame = Frame::new(70_000, 70_000, Vec::new(), 0);
        assert_eq!(frame.pixel_count(), 4_900_000_000);
    }

    #[test]
    fn test_crop_takes_requested_pixels() {
        let frame = gradient_frame(64, 48);
        let crop = crop_region(&frame, &Region::new(10, 20, 5, 4)).unwrap();

        assert_eq!(crop.dimensions(), (5, 4));
        assert_eq!(crop.get_pixel(0, 0), &Rgba([10, 20, 0, 255]));
        assert_eq!(crop.get_pixel(4, 3), &Rgba([14, 23, 0, 255]));
    }

    #[test]
    fn test_crop_rejects_out_of_bounds() {
        let frame = gradient_frame(64, 48);

        assert!(crop_region(&frame, &Region::new(60, 0, 5, 4)).is_none());
        assert!(crop_region(&frame, &Region::new(0, 0, 0, 4)).is_none());
        assert!(crop_region(&frame, &Region::new(u32::MAX, 0, 2, 2)).is_none());
        assert!(crop_region(&frame, &Region::new(0, 0, 64, 48)).is_some());
    }

    #[test]
    fn test_crop_rejects_short_buffer() {
        let frame = Frame::new(10, 10, vec![0u8; 10], 0);
        assert!(crop_region(&frame, &Region::new(0, 0, 2, 2)).is_none());
    }

    #[test]
    fn test_region_deserializes_from_both_forms() {
        let rect: Region = json5::from_str("{ x: 1, y: 2, width: 3, height: 4 }").unwrap();
        let tuple: Region = json5::from_str("[1, 2, 3, 4]").unwrap();

        assert_eq!(rect, Region::new(1, 2, 3, 4));
        assert_eq!(rect, tuple);
    }
}
