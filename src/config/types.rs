use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// 預設設定檔名稱（位於目前工作目錄）
pub const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub engine: EngineSettings,
    pub scene: SceneSettings,
    pub silence: SilenceSettings,
    pub encode: EncodeSettings,
    pub thumbnail: ThumbnailSettings,
}

/// 外部程式設定
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// ffmpeg 路徑，未指定時從 PATH 尋找
    pub ffmpeg: Option<PathBuf>,
    /// ffprobe 路徑，未指定時從 PATH 尋找
    pub ffprobe: Option<PathBuf>,
    /// 單次呼叫的逾時秒數，0 表示不限制
    pub timeout_seconds: u64,
}

impl EngineSettings {
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        if self.timeout_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_seconds))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    /// 場景變換分數門檻 (0-1)，越低越敏感
    pub threshold: f64,
    /// auto 流程找不到場景時改用的門檻
    pub fallback_threshold: f64,
    /// merge 保留片段的最短秒數
    pub min_duration: f64,
    /// 分析前縮放到的寬度（加速分析）
    pub analyze_width: u32,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            fallback_threshold: crate::component::scene_split::FALLBACK_THRESHOLD,
            min_duration: 3.0,
            analyze_width: 320,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SilenceSettings {
    /// 靜音判定音量 (dB)
    pub noise_db: f64,
    /// 最短靜音秒數
    pub min_silence: f64,
    /// 靜音邊界的保護緩衝秒數
    pub padding: f64,
}

impl Default for SilenceSettings {
    fn default() -> Self {
        Self {
            noise_db: -30.0,
            min_silence: 0.5,
            padding: 0.1,
        }
    }
}

/// 片段重新編碼參數
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeSettings {
    pub video_codec: String,
    pub preset: String,
    pub crf: u8,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            preset: "fast".to_string(),
            crf: 18,
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScorerKind {
    /// 依畫面亮度分布評分
    Luma,
    /// 只看時間位置的參考評分
    Reference,
}

impl fmt::Display for ScorerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Luma => write!(f, "luma"),
            Self::Reference => write!(f, "reference"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailSettings {
    /// 最佳畫面的候選數量
    pub candidates: usize,
    /// 縮圖輸出寬度
    pub widths: Vec<u32>,
    /// JPEG 品質 (1-31，數字越小品質越高)
    pub quality: u8,
    pub grid_rows: usize,
    pub grid_cols: usize,
    /// GIF 預覽長度（秒）
    pub preview_seconds: f64,
    pub preview_width: u32,
    pub preview_fps: u32,
    /// 平行產生縮圖的工作執行緒數
    pub workers: usize,
    pub scorer: ScorerKind,
}

impl Default for ThumbnailSettings {
    fn default() -> Self {
        Self {
            candidates: 10,
            widths: vec![320, 640, 1280],
            quality: 2,
            grid_rows: 3,
            grid_cols: 3,
            preview_seconds: 3.0,
            preview_width: 320,
            preview_fps: 10,
            workers: 3,
            scorer: ScorerKind::Luma,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_use_defaults() {
        let json = r#"{ "scene": { "threshold": 0.4 }, "engine": { "timeout_seconds": 60 } }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();

        assert!((settings.scene.threshold - 0.4).abs() < f64::EPSILON);
        assert!((settings.scene.min_duration - 3.0).abs() < f64::EPSILON);
        assert_eq!(settings.engine.timeout(), Some(Duration::from_secs(60)));
        assert_eq!(settings.thumbnail.widths, vec![320, 640, 1280]);
        assert_eq!(settings.thumbnail.scorer, ScorerKind::Luma);
    }

    #[test]
    fn test_zero_timeout_means_unbounded() {
        assert!(EngineSettings::default().timeout().is_none());
    }

    #[test]
    fn test_scorer_kind_serde() {
        let kind: ScorerKind = serde_json::from_str("\"reference\"").unwrap();
        assert_eq!(kind, ScorerKind::Reference);
        assert_eq!(kind.to_string(), "reference");
    }
}
