use crate::config::types::{SETTINGS_FILE_NAME, Settings};
use crate::error::{EditError, EditResult};
use crate::tools::EngineConfig;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

impl Settings {
    /// 讀取設定檔；未指定路徑時使用工作目錄下的 settings.json
    ///
    /// 預設設定檔不存在時回傳預設值，明確指定的檔案不存在則視為錯誤。
    pub fn load(path: Option<&Path>) -> EditResult<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(SETTINGS_FILE_NAME), false),
        };

        if !path.exists() {
            if explicit {
                return Err(EditError::Config(format!(
                    "設定檔不存在: {}",
                    path.display()
                )));
            }
            debug!("未找到設定檔，使用預設值");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let settings = serde_json::from_str(&content).map_err(|e| {
            EditError::Config(format!("無法解析設定檔 {}: {e}", path.display()))
        })?;

        debug!("已載入設定檔: {}", path.display());
        Ok(settings)
    }

    /// 解析外部程式位置，整個程序只做一次
    pub fn resolve_engine(&self) -> EditResult<EngineConfig> {
        let ffmpeg = resolve_binary("ffmpeg", self.engine.ffmpeg.as_deref())?;
        let ffprobe = resolve_binary("ffprobe", self.engine.ffprobe.as_deref())?;

        Ok(EngineConfig {
            ffmpeg,
            ffprobe,
            timeout: self.engine.timeout(),
        })
    }
}

fn resolve_binary(name: &str, configured: Option<&Path>) -> EditResult<PathBuf> {
    match configured {
        Some(path) if path.is_file() => Ok(path.to_path_buf()),
        Some(path) => which::which(path).map_err(|_| EditError::EngineNotFound {
            binary: path.display().to_string(),
        }),
        None => which::which(name).map_err(|_| EditError::EngineNotFound {
            binary: name.to_string(),
        }),
    }
}
