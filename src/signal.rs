use crate::error::{EditError, EditResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 設定 Ctrl-C 處理器，回傳的旗標在收到中斷時變為 true
///
/// 執行中的 ffmpeg 會在下一次輪詢時被終止。
pub fn setup_shutdown_signal() -> EditResult<Arc<AtomicBool>> {
    let shutdown_signal = Arc::new(AtomicBool::new(false));
    let signal_clone = Arc::clone(&shutdown_signal);

    ctrlc::set_handler(move || {
        signal_clone.store(true, Ordering::SeqCst);
        eprintln!("\n收到中斷信號，正在終止 ffmpeg...");
    })
    .map_err(|e| EditError::Config(format!("無法設定 Ctrl-C 處理器: {e}")))?;

    Ok(shutdown_signal)
}
