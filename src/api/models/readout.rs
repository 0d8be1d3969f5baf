use serde::{Deserialize, Serialize};

/// 单次运行的汇总（纯数据，便于跨语言传递）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub samples_processed: u64,
    /// 解码失败被跳过的帧号
    pub skipped_frames: Vec<u64>,
    pub timeouts: u64,
    pub recognition_errors: u64,
    pub written_files: Vec<String>,
    /// 写出失败的文件及原因
    pub write_failures: Vec<String>,
}
