use crate::config::types::Settings;
use crate::error::{EditError, EditResult};
use std::fs;
use std::path::Path;

/// 寫出設定檔，`force` 為 false 時不覆蓋既有檔案
pub fn save_settings(settings: &Settings, path: &Path, force: bool) -> EditResult<()> {
    if path.exists() && !force {
        return Err(EditError::Config(format!(
            "設定檔已存在: {}（使用 --force 覆蓋）",
            path.display()
        )));
    }

    let content = serde_json::to_string_pretty(settings)
        .map_err(|e| EditError::Config(format!("無法序列化設定: {e}")))?;

    fs::write(path, content)?;
    Ok(())
}
