use crate::error::{EditError, EditResult};
use std::path::{Path, PathBuf};

/// 確認輸入影片存在，在呼叫任何外部程式之前檢查
pub fn validate_input_file(path: &Path) -> EditResult<()> {
    if !path.is_file() {
        return Err(EditError::InputNotFound(path.to_path_buf()));
    }
    Ok(())
}

pub fn ensure_directory_exists(path: &Path) -> EditResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// 影片檔名（不含副檔名），作為輸出檔名前綴
#[must_use]
pub fn video_stem(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| "video".to_string(), |s| s.to_string_lossy().to_string())
}

/// 影片副檔名，沒有時使用 mp4
#[must_use]
pub fn video_extension(path: &Path) -> String {
    path.extension()
        .map_or_else(|| "mp4".to_string(), |s| s.to_string_lossy().to_string())
}

/// 輸出資料夾：未指定時使用影片所在資料夾
#[must_use]
pub fn output_directory(video: &Path, requested: Option<&Path>) -> PathBuf {
    requested.map_or_else(
        || {
            video
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."))
                .to_path_buf()
        },
        Path::to_path_buf,
    )
}

/// `<stem>_<suffix>.<ext>`
#[must_use]
pub fn derived_file_name(video: &Path, suffix: &str, extension: &str) -> String {
    format!("{}_{suffix}.{extension}", video_stem(video))
}
