use super::ffmpeg_command::{FfmpegCommand, format_seconds};
use std::path::Path;

/// 格狀預覽圖的單格尺寸
pub const TILE_WIDTH: u32 = 320;
pub const TILE_HEIGHT: u32 = 180;

/// 兩段式 seek 的前置緩衝時間（秒）
const SEEK_MARGIN: f64 = 2.0;

/// 擷取畫面的縮放方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameScale {
    /// 保持原始尺寸
    Original,
    /// 指定寬度，高度依比例（偶數）
    Width(u32),
    /// 固定格子尺寸，不足部分填黑
    Tile { width: u32, height: u32 },
}

/// 單張畫面擷取請求
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRequest {
    pub timestamp: f64,
    pub scale: FrameScale,
    /// JPEG 品質 (1-31，數字越小品質越高)
    pub quality: u8,
    /// 疊加在畫面左下角的文字
    pub label: Option<String>,
}

impl FrameRequest {
    #[must_use]
    pub const fn new(timestamp: f64, scale: FrameScale, quality: u8) -> Self {
        Self {
            timestamp,
            scale,
            quality,
            label: None,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// 建立擷取單張畫面的命令（兩段式 seek）
///
/// 1. `-ss` 在 `-i` 前：快速跳轉到最近的關鍵幀
/// 2. `-ss` 在 `-i` 後：精準解碼到目標時間點
#[must_use]
pub fn frame_command(
    ffmpeg: &Path,
    video: &Path,
    request: &FrameRequest,
    output: &Path,
) -> FfmpegCommand {
    let t0 = (request.timestamp - SEEK_MARGIN).max(0.0);
    let delta = request.timestamp.max(0.0) - t0;

    let mut cmd = FfmpegCommand::new(ffmpeg, "extract frame").args(["-loglevel", "error"]);

    if t0 > 0.0 {
        cmd = cmd.arg("-ss").arg(format_seconds(t0));
    }

    cmd = cmd.arg("-i").arg(video);

    if delta > 0.0 {
        cmd = cmd.arg("-ss").arg(format_seconds(delta));
    }

    cmd = cmd.args(["-frames:v", "1", "-an", "-sn", "-dn", "-threads", "1"]);

    if let Some(filter) = build_filter(request) {
        cmd = cmd.arg("-vf").arg(filter);
    }

    cmd.arg("-q:v")
        .arg(request.quality.clamp(1, 31).to_string())
        .arg("-y")
        .arg(output)
}

fn build_filter(request: &FrameRequest) -> Option<String> {
    let mut filters = Vec::new();

    match request.scale {
        FrameScale::Original => {}
        FrameScale::Width(width) => filters.push(format!("scale={width}:-2")),
        FrameScale::Tile { width, height } => filters.push(format!(
            "scale={width}:{height}:force_original_aspect_ratio=decrease,pad={width}:{height}:(ow-iw)/2:(oh-ih)/2:black"
        )),
    }

    if let Some(label) = &request.label {
        filters.push(format!(
            "drawtext=text='{}':x=8:y=h-th-8:fontsize=20:fontcolor=white:box=1:boxcolor=black@0.6:boxborderw=4",
            escape_drawtext(label)
        ));
    }

    if filters.is_empty() {
        None
    } else {
        Some(filters.join(","))
    }
}

/// drawtext 文字中的冒號、引號與反斜線需要跳脫
fn escape_drawtext(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | ':' | '\'' | '%') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// 秒數格式化為 `HH:MM:SS`
#[must_use]
pub fn format_timecode(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}
