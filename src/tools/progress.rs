use indicatif::{ProgressBar, ProgressStyle};

/// 建立逐段處理用的進度條（輸出到 stderr）
///
/// `visible` 為 false 時回傳隱藏的進度條，呼叫端不必另外判斷。
#[must_use]
pub fn step_progress(len: usize, message: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let progress_bar = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        progress_bar.set_style(style.progress_chars("#>-"));
    }
    progress_bar.set_message(message.to_string());
    progress_bar
}
