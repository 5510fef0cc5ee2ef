use std::path::PathBuf;
use thiserror::Error;

pub type EditResult<T> = Result<T, EditError>;

/// 剪輯流程的錯誤分類
///
/// 訊息中不包含暫存檔路徑與 ffmpeg 原始輸出，
/// stderr 只保留在欄位中供日誌使用。
#[derive(Debug, Error)]
pub enum EditError {
    #[error("找不到輸入檔案: {0}")]
    InputNotFound(PathBuf),

    #[error("找不到外部程式: {binary}")]
    EngineNotFound { binary: String },

    #[error("{operation} 執行失敗 ({status})")]
    EngineInvocation {
        operation: String,
        status: String,
        stderr_tail: String,
    },

    #[error("{operation} 輸出無法解析: {message}")]
    EngineOutput { operation: String, message: String },

    #[error("{stage} 過濾後沒有剩餘片段（原有 {original_count} 個，門檻 {threshold}）")]
    EmptyResult {
        stage: String,
        original_count: usize,
        threshold: f64,
    },

    #[error("時間點序列不合法: {0}")]
    InvalidTimestamps(String),

    #[error("第 {index} 個片段切割失敗（已完成 {completed} 個）")]
    SplitAborted {
        index: usize,
        completed: usize,
        #[source]
        source: Box<EditError>,
    },

    #[error("{operation} 超過 {seconds} 秒未完成，已終止")]
    Timeout { operation: String, seconds: u64 },

    #[error("操作已取消")]
    Cancelled,

    #[error("設定錯誤: {0}")]
    Config(String),

    #[error("IO 錯誤: {0}")]
    Io(#[from] std::io::Error),
}

impl EditError {
    pub fn engine_output(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EngineOutput {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// 是否為可調整參數後重試的狀況
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::EmptyResult { .. })
    }
}
