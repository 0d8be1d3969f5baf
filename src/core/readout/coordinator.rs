//! 区域 OCR 协调器 - 每帧并发识别所有区域，单区域超时不阻塞整体
//!
//! 每个采样帧：
//! 1. 先裁剪出全部区域（纯计算，派发前完成）
//! 2. 每个区域一个独立线程执行 OCR + 数字解析
//! 3. 统一截止时间等待结果；超时的任务被放弃（后台继续运行，结果丢弃）
//! 4. 按区域顺序返回恰好 N 个结果

use super::error::{ExtractError, RecognitionError};
use super::frame::{crop_region, Frame, Region, RegionCrop};
use super::numbers::parse_numbers;
use super::recognizer::TextRecognizer;
use log::{debug, error, warn};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// 区域失败原因
#[derive(Debug, Clone, PartialEq)]
pub enum RegionFailure {
    TimedOut { after: Duration },
    Recognition(RecognitionError),
}

/// 单个 (采样, 区域) 的识别结果
#[derive(Debug, Clone, PartialEq)]
pub struct RegionResult {
    pub numbers: Vec<String>,
    pub failure: Option<RegionFailure>,
}

impl RegionResult {
    pub fn recognized(numbers: Vec<String>) -> Self {
        Self {
            numbers,
            failure: None,
        }
    }

    pub fn timed_out(after: Duration) -> Self {
        Self {
            numbers: Vec::new(),
            failure: Some(RegionFailure::TimedOut { after }),
        }
    }

    pub fn failed(error: RecognitionError) -> Self {
        Self {
            numbers: Vec::new(),
            failure: Some(RegionFailure::Recognition(error)),
        }
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self.failure, Some(RegionFailure::TimedOut { .. }))
    }

    pub fn is_recognition_error(&self) -> bool {
        matches!(self.failure, Some(RegionFailure::Recognition(_)))
    }

    /// 空格拼接的数字串，即 CSV 的 Numbers 列
    pub fn joined(&self) -> String {
        self.numbers.join(" ")
    }
}

type TaskOutcome = (usize, Result<Vec<String>, RecognitionError>);

/// 区域 OCR 协调器
pub struct RegionOcrCoordinator {
    regions: Vec<Region>,
    recognizer: Arc<dyn TextRecognizer>,
    timeout: Duration,
}

impl RegionOcrCoordinator {
    pub fn new(
        regions: Vec<Region>,
        recognizer: Arc<dyn TextRecognizer>,
        timeout: Duration,
    ) -> Result<Self, ExtractError> {
        if regions.is_empty() {
            return Err(ExtractError::InvalidConfiguration(
                "at least one region is required".to_string(),
            ));
        }
        if timeout.is_zero() {
            return Err(ExtractError::InvalidConfiguration(
                "OCR timeout must be positive".to_string(),
            ));
        }
        if let Some((index, region)) = regions.iter().enumerate().find(|(_, r)| r.is_empty()) {
            return Err(ExtractError::InvalidConfiguration(format!(
                "region {} has an empty rectangle {:?}",
                index, region
            )));
        }

        Ok(Self {
            regions,
            recognizer,
            timeout,
        })
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 检查所有区域都落在 width x height 的帧内
    pub fn check_frame_bounds(&self, width: u32, height: u32) -> Result<(), ExtractError> {
        for (index, region) in self.regions.iter().enumerate() {
            if !region.fits_within(width, height) {
                return Err(ExtractError::InvalidConfiguration(format!(
                    "region {} {:?} does not fit a {}x{} frame",
                    index, region, width, height
                )));
            }
        }
        Ok(())
    }

    /// 并发识别一帧的所有区域，按区域顺序返回 N 个结果，最长等待约一个超时
    pub fn process(&self, frame: &Frame) -> Vec<RegionResult> {
        let mut results: Vec<Option<RegionResult>> = vec![None; self.regions.len()];

        let crops: Vec<Option<RegionCrop>> = self
            .regions
            .iter()
            .enumerate()
            .map(|(region_index, region)| {
                crop_region(frame, region).map(|image| RegionCrop {
                    region_index,
                    frame_number: frame.frame_number,
                    image,
                })
            })
            .collect();

        let (tx, rx) = mpsc::channel::<TaskOutcome>();
        let mut pending = 0usize;

        for (region_index, crop) in crops.into_iter().enumerate() {
            let Some(crop) = crop else {
                results[region_index] = Some(RegionResult::failed(RecognitionError::InvalidImage(
                    format!(
                        "region {:?} outside {}x{} frame",
                        self.regions[region_index], frame.width, frame.height
                    ),
                )));
                continue;
            };

            let tx = tx.clone();
            let recognizer = Arc::clone(&self.recognizer);
            let spawned = thread::Builder::new()
                .name(format!("ocr-region-{}", region_index))
                .spawn(move || {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                        recognizer.recognize(&crop).map(|text| parse_numbers(&text))
                    }))
                    .unwrap_or_else(|_| {
                        Err(RecognitionError::Engine("recognizer panicked".to_string()))
                    });
                    // 超时后收集端已不再接收，发送失败可忽略
                    let _ = tx.send((region_index, outcome));
                });

            match spawned {
                // 丢弃句柄即分离任务
                Ok(_) => pending += 1,
                Err(e) => {
                    error!("❌ Failed to spawn OCR task for region {}: {}", region_index, e);
                    results[region_index] =
                        Some(RegionResult::failed(RecognitionError::Spawn(e.to_string())));
                }
            }
        }
        drop(tx);

        // 超时过大无法表示为时间点时不设截止
        let deadline = Instant::now().checked_add(self.timeout);
        self.collect(frame.frame_number, &rx, pending, &mut results, deadline);

        results
            .into_iter()
            .enumerate()
            .map(|(region_index, result)| {
                result.unwrap_or_else(|| {
                    warn!(
                        "⏱️ Region {} on frame {} exceeded {:?}, abandoning OCR task",
                        region_index, frame.frame_number, self.timeout
                    );
                    RegionResult::timed_out(self.timeout)
                })
            })
            .collect()
    }

    /// 收集任务结果直到全部返回或到达截止时间，
    /// 发送端全部断开时，仍未返回的区域记为识别错误而非超时
    fn collect(
        &self,
        frame_number: u64,
        rx: &Receiver<TaskOutcome>,
        mut pending: usize,
        results: &mut [Option<RegionResult>],
        deadline: Option<Instant>,
    ) {
        while pending > 0 {
            let received = match deadline {
                Some(deadline) => {
                    rx.recv_timeout(deadline.saturating_duration_since(Instant::now()))
                }
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok((region_index, outcome)) => {
                    pending -= 1;
                    results[region_index] = Some(self.record(frame_number, region_index, outcome));
                }
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    for (region_index, slot) in results.iter_mut().enumerate() {
                        if slot.is_none() {
                            error!(
                                "❌ Region {} on frame {}: OCR task ended without a result",
                                region_index, frame_number
                            );
                            *slot = Some(RegionResult::failed(RecognitionError::Engine(
                                "task ended without a result".to_string(),
                            )));
                        }
                    }
                    break;
                }
            }
        }
    }

    fn record(
        &self,
        frame_number: u64,
        region_index: usize,
        outcome: Result<Vec<String>, RecognitionError>,
    ) -> RegionResult {
        match outcome {
            Ok(numbers) => {
                debug!(
                    "Region {} frame {}: {:?}",
                    region_index, frame_number, numbers
                );
                RegionResult::recognized(numbers)
            }
            Err(e) => {
                warn!(
                    "⚠️ Region {} on frame {} recognition failed: {}",
                    region_index, frame_number, e
                );
                RegionResult::failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::readout::recognizer::MockRecognizer;

    fn three_regions() -> Vec<Region> {
        vec![
            Region::new(0, 0, 10, 10),
            Region::new(10, 0, 10, 10),
            Region::new(20, 0, 10, 10),
        ]
    }

    fn test_frame() -> Frame {
        Frame::filled(40, 20, [0, 0, 0, 255], 12)
    }

    fn coordinator(recognizer: MockRecognizer, timeout: Duration) -> RegionOcrCoordinator {
        RegionOcrCoordinator::new(three_regions(), Arc::new(recognizer), timeout).unwrap()
    }

    #[test]
    fn test_all_regions_recognized_in_order() {
        let recognizer = MockRecognizer::with_pattern(|c| {
            // 靠后的区域先完成
            thread::sleep(Duration::from_millis(60 - 20 * c.region_index as u64));
            Ok(format!("v{} f{}", c.region_index, c.frame_number))
        });
        let results = coordinator(recognizer, Duration::from_secs(5)).process(&test_frame());

        assert_eq!(results.len(), 3);
        for (i, r) in results.iter().enumerate() {
            assert_eq!(r.numbers, vec![i.to_string(), "12".to_string()]);
            assert!(r.failure.is_none());
        }
    }

    #[test]
    fn test_hung_region_times_out_without_stalling_others() {
        let recognizer = MockRecognizer::with_pattern(|c| {
            if c.region_index == 2 {
                thread::sleep(Duration::from_secs(60));
            }
            Ok(format!("{}00", c.region_index + 1))
        });
        let coordinator = coordinator(recognizer, Duration::from_secs(1));

        let started = Instant::now();
        let results = coordinator.process(&test_frame());
        let elapsed = started.elapsed();

        assert!(elapsed >= Duration::from_millis(900), "returned too early: {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(2500), "took {:?}", elapsed);
        assert_eq!(results[0], RegionResult::recognized(vec!["100".to_string()]));
        assert_eq!(results[1], RegionResult::recognized(vec!["200".to_string()]));
        assert!(results[2].is_timed_out());
        assert!(results[2].numbers.is_empty());
    }

    #[test]
    fn test_all_hung_regions_bounded_by_one_timeout() {
        let recognizer = MockRecognizer::with_pattern(|_| {
            thread::sleep(Duration::from_secs(60));
            Ok(String::new())
        });
        let coordinator = coordinator(recognizer, Duration::from_millis(300));

        let started = Instant::now();
        let results = coordinator.process(&test_frame());

        assert!(started.elapsed() < Duration::from_millis(800));
        assert!(results.iter().all(RegionResult::is_timed_out));
    }

    #[test]
    fn test_recognition_error_is_isolated() {
        let recognizer = MockRecognizer::with_pattern(|c| {
            if c.region_index == 1 {
                Err(RecognitionError::Engine("engine crashed".to_string()))
            } else {
                Ok("7".to_string())
            }
        });
        let results = coordinator(recognizer, Duration::from_secs(5)).process(&test_frame());

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].numbers, vec!["7"]);
        assert_eq!(
            results[1],
            RegionResult::failed(RecognitionError::Engine("engine crashed".to_string()))
        );
        assert!(results[1].is_recognition_error());
        assert_eq!(results[2].numbers, vec!["7"]);
    }

    #[test]
    fn test_panicking_recognizer_is_recorded_as_error() {
        let recognizer = MockRecognizer::with_pattern(|c| {
            if c.region_index == 0 {
                panic!("bad crop");
            }
            Ok("1".to_string())
        });
        let results = coordinator(recognizer, Duration::from_secs(5)).process(&test_frame());

        assert!(results[0].is_recognition_error());
        assert_eq!(results[1].numbers, vec!["1"]);
        assert_eq!(results[2].numbers, vec!["1"]);
    }

    #[test]
    fn test_huge_timeout_waits_without_deadline() {
        let recognizer = MockRecognizer::with_fixed_text("42");
        let coordinator = coordinator(recognizer, Duration::from_secs(u64::MAX));

        let results = coordinator.process(&test_frame());

        assert!(results.iter().all(|r| r.numbers == vec!["42"]));
    }

    #[test]
    fn test_task_ending_without_result_is_not_a_timeout() {
        let c = coordinator(MockRecognizer::new(), Duration::from_secs(30));
        let (tx, rx) = mpsc::channel::<TaskOutcome>();
        tx.send((0, Ok(vec!["5".to_string()]))).unwrap();
        drop(tx);

        let mut results: Vec<Option<RegionResult>> = vec![None; 3];
        let started = Instant::now();
        c.collect(0, &rx, 3, &mut results, Instant::now().checked_add(c.timeout()));

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(results[0], Some(RegionResult::recognized(vec!["5".to_string()])));
        for result in &results[1..] {
            assert_eq!(
                result,
                &Some(RegionResult::failed(RecognitionError::Engine(
                    "task ended without a result".to_string()
                )))
            );
        }
    }

    #[test]
    fn test_region_outside_frame_fails_only_that_region() {
        let recognizer = MockRecognizer::with_fixed_text("3");
        let results = coordinator(recognizer, Duration::from_secs(5))
            .process(&Frame::filled(25, 20, [0, 0, 0, 255], 0));

        assert_eq!(results[0].numbers, vec!["3"]);
        assert_eq!(results[1].numbers, vec!["3"]);
        assert!(matches!(
            results[2].failure,
            Some(RegionFailure::Recognition(RecognitionError::InvalidImage(_)))
        ));
    }

    #[test]
    fn test_invalid_construction() {
        let recognizer: Arc<dyn TextRecognizer> = Arc::new(MockRecognizer::new());

        assert!(RegionOcrCoordinator::new(vec![], recognizer.clone(), Duration::from_secs(1)).is_err());
        assert!(RegionOcrCoordinator::new(three_regions(), recognizer.clone(), Duration::ZERO).is_err());
        assert!(RegionOcrCoordinator::new(
            vec![Region::new(0, 0, 0, 5)],
            recognizer,
            Duration::from_secs(1)
        )
        .is_err());
    }

    #[test]
    fn test_check_frame_bounds() {
        let c = coordinator(MockRecognizer::new(), Duration::from_secs(1));

        assert!(c.check_frame_bounds(30, 10).is_ok());
        assert!(matches!(
            c.check_frame_bounds(29, 10),
            Err(ExtractError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_joined_numbers() {
        assert_eq!(
            RegionResult::recognized(vec!["12".into(), "034".into()]).joined(),
            "12 034"
        );
        assert_eq!(RegionResult::timed_out(Duration::from_secs(1)).joined(), "");
    }
}
