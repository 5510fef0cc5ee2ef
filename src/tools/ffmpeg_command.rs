use crate::config::EncodeSettings;
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// 以參數陣列組成的外部程式呼叫
///
/// 所有路徑都以 `OsStr` 原樣傳入，不經過 shell，
/// 檔名含空白、引號或分號也不會被解讀。
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    program: PathBuf,
    operation: &'static str,
    args: Vec<OsString>,
}

impl FfmpegCommand {
    /// 建立 ffmpeg 呼叫，預設關閉 banner 與 stdin 互動
    #[must_use]
    pub fn new(program: &Path, operation: &'static str) -> Self {
        Self::bare(program, operation).args(["-hide_banner", "-nostdin"])
    }

    /// 建立不帶預設參數的呼叫（ffprobe 使用）
    #[must_use]
    pub fn bare(program: &Path, operation: &'static str) -> Self {
        Self {
            program: program.to_path_buf(),
            operation,
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    #[must_use]
    pub const fn operation(&self) -> &'static str {
        self.operation
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    #[must_use]
    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    #[must_use]
    pub fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

/// 秒數轉為 ffmpeg 時間參數（毫秒精度）
#[must_use]
pub fn format_seconds(seconds: f64) -> String {
    format!("{:.3}", seconds.max(0.0))
}

/// 場景變換掃描
///
/// 先縮小畫面再套用 scene 分數過濾，showinfo 會把通過的畫格
/// 時間點寫到 stderr。
#[must_use]
pub fn scene_scan(ffmpeg: &Path, video: &Path, threshold: f64, analyze_width: u32) -> FfmpegCommand {
    let filter = format!("scale={analyze_width}:-2,select='gt(scene,{threshold})',showinfo");

    FfmpegCommand::new(ffmpeg, "scene scan")
        .arg("-i")
        .arg(video)
        .args(["-an", "-sn", "-dn", "-vf"])
        .arg(filter)
        .args(["-f", "null", "-"])
}

/// 靜音區段掃描
#[must_use]
pub fn silence_scan(ffmpeg: &Path, video: &Path, noise_db: f64, min_silence: f64) -> FfmpegCommand {
    let filter = format!("silencedetect=noise={noise_db}dB:d={min_silence}");

    FfmpegCommand::new(ffmpeg, "silence scan")
        .arg("-i")
        .arg(video)
        .args(["-vn", "-sn", "-dn", "-af"])
        .arg(filter)
        .args(["-f", "null", "-"])
}

/// 切出指定時間範圍並重新編碼（確保切點精準）
#[must_use]
pub fn trim(
    ffmpeg: &Path,
    video: &Path,
    start: f64,
    duration: f64,
    output: &Path,
    encode: &EncodeSettings,
) -> FfmpegCommand {
    FfmpegCommand::new(ffmpeg, "trim")
        .args(["-loglevel", "error", "-y"])
        .arg("-ss")
        .arg(format_seconds(start))
        .arg("-i")
        .arg(video)
        .arg("-t")
        .arg(format_seconds(duration))
        .args(["-map", "0:v:0", "-map", "0:a:0?"])
        .arg("-c:v")
        .arg(&encode.video_codec)
        .arg("-preset")
        .arg(&encode.preset)
        .arg("-crf")
        .arg(encode.crf.to_string())
        .arg("-c:a")
        .arg(&encode.audio_codec)
        .arg("-b:a")
        .arg(&encode.audio_bitrate)
        .args(["-avoid_negative_ts", "make_zero"])
        .arg(output)
}

/// 依清單串接片段（stream copy）
#[must_use]
pub fn concat(ffmpeg: &Path, manifest: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(ffmpeg, "concat")
        .args(["-loglevel", "error", "-y", "-f", "concat", "-safe", "0", "-i"])
        .arg(manifest)
        .args(["-c", "copy"])
        .arg(output)
}

/// concat demuxer 清單內容
///
/// 每行 `file '<path>'`，路徑中的單引號依 ffmpeg 規則跳脫為 `'\''`。
/// ffmpeg 以清單所在資料夾解析相對路徑，因此一律寫入絕對路徑。
pub fn concat_manifest(clips: &[PathBuf]) -> io::Result<String> {
    let mut manifest = String::new();
    for clip in clips {
        let clip = std::path::absolute(clip)?;
        let escaped = clip.to_string_lossy().replace('\'', r"'\''");
        manifest.push_str("file '");
        manifest.push_str(&escaped);
        manifest.push_str("'\n");
    }
    Ok(manifest)
}

/// GIF 預覽參數
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewRequest {
    pub start: f64,
    pub duration: f64,
    pub width: u32,
    pub fps: u32,
}

/// 產生 GIF 預覽（調色盤生成交給 ffmpeg）
#[must_use]
pub fn animated_preview(
    ffmpeg: &Path,
    video: &Path,
    request: &PreviewRequest,
    output: &Path,
) -> FfmpegCommand {
    let filter = format!(
        "fps={},scale={}:-1:flags=lanczos,split[s0][s1];[s0]palettegen[p];[s1][p]paletteuse",
        request.fps, request.width
    );

    FfmpegCommand::new(ffmpeg, "animated preview")
        .args(["-loglevel", "error", "-y"])
        .arg("-ss")
        .arg(format_seconds(request.start))
        .arg("-t")
        .arg(format_seconds(request.duration))
        .arg("-i")
        .arg(video)
        .args(["-an", "-filter_complex"])
        .arg(filter)
        .args(["-loop", "0"])
        .arg(output)
}

/// 亮度取樣畫面尺寸
pub const LUMA_SAMPLE_WIDTH: u32 = 64;
pub const LUMA_SAMPLE_HEIGHT: u32 = 36;

/// 擷取單張灰階小圖到 stdout（原始像素）
#[must_use]
pub fn luma_sample(ffmpeg: &Path, video: &Path, timestamp: f64) -> FfmpegCommand {
    let filter = format!("scale={LUMA_SAMPLE_WIDTH}:{LUMA_SAMPLE_HEIGHT},format=gray");

    FfmpegCommand::new(ffmpeg, "luma sample")
        .args(["-loglevel", "error"])
        .arg("-ss")
        .arg(format_seconds(timestamp))
        .arg("-i")
        .arg(video)
        .args(["-frames:v", "1", "-an", "-sn", "-dn", "-vf"])
        .arg(filter)
        .args(["-f", "rawvideo", "-"])
}

/// ffprobe 取得串流與格式資訊（JSON）
#[must_use]
pub fn probe(ffprobe: &Path, video: &Path) -> FfmpegCommand {
    FfmpegCommand::bare(ffprobe, "probe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(video)
}
