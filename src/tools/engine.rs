use super::contact_sheet_merger::grid_command;
use super::ffmpeg_command::{self, FfmpegCommand, PreviewRequest};
use super::ffprobe_info::{VideoInfo, parse_duration, parse_video_info};
use super::thumbnail_extractor::{FrameRequest, frame_command};
use crate::component::scene_split::parse_scene_output;
use crate::component::silence_removal::{SilenceInterval, parse_silence_output};
use crate::config::EncodeSettings;
use crate::error::{EditError, EditResult};
use log::{debug, warn};
use std::fs;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// 外部影音引擎的命令契約
///
/// 所有解碼、比對、編碼都由引擎完成，流程層只負責參數與順序。
/// 實作必須可在多個工作執行緒間共用。
pub trait MediaEngine: Sync {
    /// 影片尺寸、長度與幀率
    fn probe(&self, video: &Path) -> EditResult<VideoInfo>;

    /// 只取長度
    fn probe_duration(&self, video: &Path) -> EditResult<f64>;

    /// 場景變換時間點（依出現順序）
    fn scan_for_changes(&self, video: &Path, threshold: f64) -> EditResult<Vec<f64>>;

    fn detect_silence(
        &self,
        video: &Path,
        noise_db: f64,
        min_silence: f64,
    ) -> EditResult<Vec<SilenceInterval>>;

    fn trim(&self, video: &Path, start: f64, duration: f64, output: &Path) -> EditResult<()>;

    /// 依序串接片段，清單檔寫到 `manifest`
    fn concatenate(&self, clips: &[PathBuf], manifest: &Path, output: &Path) -> EditResult<()>;

    fn extract_frame(&self, video: &Path, request: &FrameRequest, output: &Path)
    -> EditResult<()>;

    fn build_animated_preview(
        &self,
        video: &Path,
        request: &PreviewRequest,
        output: &Path,
    ) -> EditResult<()>;

    fn build_grid(
        &self,
        frames: &[PathBuf],
        rows: usize,
        cols: usize,
        output: &Path,
    ) -> EditResult<()>;

    /// 灰階小圖的原始像素，供畫面評分使用
    fn sample_luma(&self, video: &Path, timestamp: f64) -> EditResult<Vec<u8>>;
}

/// 外部程式位置與逾時設定，程序啟動時解析一次後不再變動
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub timeout: Option<Duration>,
}

/// 程序結束狀態輪詢間隔
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// 錯誤訊息保留的 stderr 行數
const STDERR_TAIL_LINES: usize = 20;

/// 外部程式執行結果
#[derive(Debug)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// 以 ffmpeg / ffprobe 實作的引擎
pub struct FfmpegEngine {
    config: EngineConfig,
    encode: EncodeSettings,
    analyze_width: u32,
    shutdown_signal: Arc<AtomicBool>,
}

impl FfmpegEngine {
    #[must_use]
    pub fn new(config: EngineConfig, shutdown_signal: Arc<AtomicBool>) -> Self {
        Self {
            config,
            encode: EncodeSettings::default(),
            analyze_width: 320,
            shutdown_signal,
        }
    }

    #[must_use]
    pub fn with_encode(mut self, encode: EncodeSettings) -> Self {
        self.encode = encode;
        self
    }

    #[must_use]
    pub const fn with_analyze_width(mut self, width: u32) -> Self {
        self.analyze_width = width;
        self
    }

    /// 執行外部程式並等待結束
    ///
    /// stdout/stderr 由背景執行緒讀取，避免管線塞滿造成卡住。
    /// 逾時或收到中斷訊號時會終止子程序並回收。
    pub fn run(&self, command: &FfmpegCommand) -> EditResult<ProcessOutput> {
        let operation = command.operation();
        debug!("執行 {operation}: {:?}", command.arguments());

        let mut child = command
            .build_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    EditError::EngineNotFound {
                        binary: command.program().display().to_string(),
                    }
                } else {
                    EditError::Io(e)
                }
            })?;

        let stdout_reader = spawn_reader(child.stdout.take());
        let stderr_reader = spawn_reader(child.stderr.take());

        let waited = self.wait_with_limits(&mut child, operation);

        let stdout = join_reader(stdout_reader);
        let stderr = String::from_utf8_lossy(&join_reader(stderr_reader)).into_owned();

        let status = waited?;
        if !status.success() {
            let stderr_tail = tail_lines(&stderr, STDERR_TAIL_LINES);
            warn!("{operation} 失敗 ({status}): {stderr_tail}");
            return Err(EditError::EngineInvocation {
                operation: operation.to_string(),
                status: status.to_string(),
                stderr_tail,
            });
        }

        Ok(ProcessOutput { stdout, stderr })
    }

    fn wait_with_limits(&self, child: &mut Child, operation: &str) -> EditResult<ExitStatus> {
        let started = Instant::now();

        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }

            if self.shutdown_signal.load(Ordering::SeqCst) {
                warn!("收到中斷訊號，終止 {operation}");
                terminate(child);
                return Err(EditError::Cancelled);
            }

            if let Some(limit) = self.config.timeout
                && started.elapsed() >= limit
            {
                warn!("{operation} 超過 {} 秒，終止程序", limit.as_secs());
                terminate(child);
                return Err(EditError::Timeout {
                    operation: operation.to_string(),
                    seconds: limit.as_secs(),
                });
            }

            thread::sleep(POLL_INTERVAL);
        }
    }

    /// 執行會產生檔案的命令，並確認輸出確實存在
    fn run_to_file(&self, command: &FfmpegCommand, output: &Path) -> EditResult<()> {
        self.run(command)?;

        if !output.exists() {
            return Err(EditError::engine_output(
                command.operation(),
                "輸出檔案未建立",
            ));
        }
        Ok(())
    }
}

impl MediaEngine for FfmpegEngine {
    fn probe(&self, video: &Path) -> EditResult<VideoInfo> {
        let output = self.run(&ffmpeg_command::probe(&self.config.ffprobe, video))?;
        parse_video_info(&String::from_utf8_lossy(&output.stdout))
    }

    fn probe_duration(&self, video: &Path) -> EditResult<f64> {
        let output = self.run(&ffmpeg_command::probe(&self.config.ffprobe, video))?;
        parse_duration(&String::from_utf8_lossy(&output.stdout))
    }

    fn scan_for_changes(&self, video: &Path, threshold: f64) -> EditResult<Vec<f64>> {
        let command =
            ffmpeg_command::scene_scan(&self.config.ffmpeg, video, threshold, self.analyze_width);
        let output = self.run(&command)?;
        Ok(parse_scene_output(&output.stderr))
    }

    fn detect_silence(
        &self,
        video: &Path,
        noise_db: f64,
        min_silence: f64,
    ) -> EditResult<Vec<SilenceInterval>> {
        let command =
            ffmpeg_command::silence_scan(&self.config.ffmpeg, video, noise_db, min_silence);
        let output = self.run(&command)?;
        parse_silence_output(&output.stderr)
    }

    fn trim(&self, video: &Path, start: f64, duration: f64, output: &Path) -> EditResult<()> {
        let command = ffmpeg_command::trim(
            &self.config.ffmpeg,
            video,
            start,
            duration,
            output,
            &self.encode,
        );
        self.run_to_file(&command, output)
    }

    fn concatenate(&self, clips: &[PathBuf], manifest: &Path, output: &Path) -> EditResult<()> {
        fs::write(manifest, ffmpeg_command::concat_manifest(clips)?)?;
        let command = ffmpeg_command::concat(&self.config.ffmpeg, manifest, output);
        self.run_to_file(&command, output)
    }

    fn extract_frame(
        &self,
        video: &Path,
        request: &FrameRequest,
        output: &Path,
    ) -> EditResult<()> {
        let command = frame_command(&self.config.ffmpeg, video, request, output);
        self.run_to_file(&command, output)
    }

    fn build_animated_preview(
        &self,
        video: &Path,
        request: &PreviewRequest,
        output: &Path,
    ) -> EditResult<()> {
        let command = ffmpeg_command::animated_preview(&self.config.ffmpeg, video, request, output);
        self.run_to_file(&command, output)
    }

    fn build_grid(
        &self,
        frames: &[PathBuf],
        rows: usize,
        cols: usize,
        output: &Path,
    ) -> EditResult<()> {
        let command = grid_command(&self.config.ffmpeg, frames, rows, cols, output)?;
        self.run_to_file(&command, output)
    }

    fn sample_luma(&self, video: &Path, timestamp: f64) -> EditResult<Vec<u8>> {
        let command = ffmpeg_command::luma_sample(&self.config.ffmpeg, video, timestamp);
        let output = self.run(&command)?;

        if output.stdout.is_empty() {
            return Err(EditError::engine_output(
                command.operation(),
                "沒有取得任何像素",
            ));
        }
        Ok(output.stdout)
    }
}

fn spawn_reader<R: Read + Send + 'static>(source: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    source.map(|mut source| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = source.read_to_end(&mut buffer);
            buffer
        })
    })
}

fn join_reader(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn tail_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with(ffmpeg: &str, timeout: Option<Duration>) -> FfmpegEngine {
        FfmpegEngine::new(
            EngineConfig {
                ffmpeg: PathBuf::from(ffmpeg),
                ffprobe: PathBuf::from("ffprobe"),
                timeout,
            },
            Arc::new(AtomicBool::new(false)),
        )
    }

    #[test]
    fn test_tail_lines() {
        let text = "a\nb\nc\nd";
        assert_eq!(tail_lines(text, 2), "c\nd");
        assert_eq!(tail_lines(text, 10), text);
        assert_eq!(tail_lines("", 3), "");
    }

    #[test]
    fn test_missing_binary_is_engine_not_found() {
        let engine = engine_with("/nonexistent/ffmpeg-binary", None);
        let command = FfmpegCommand::new(Path::new("/nonexistent/ffmpeg-binary"), "probe");
        assert!(matches!(
            engine.run(&command),
            Err(EditError::EngineNotFound { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_invocation_error() {
        let engine = engine_with("sh", None);
        let command = FfmpegCommand::bare(Path::new("sh"), "trim")
            .args(["-c", "echo boom >&2; exit 3"]);

        match engine.run(&command) {
            Err(EditError::EngineInvocation {
                operation,
                stderr_tail,
                ..
            }) => {
                assert_eq!(operation, "trim");
                assert_eq!(stderr_tail, "boom");
            }
            other => panic!("預期 EngineInvocation，實際: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_process() {
        let engine = engine_with("sh", Some(Duration::from_millis(200)));
        let command = FfmpegCommand::bare(Path::new("sh"), "scene scan").args(["-c", "exec sleep 5"]);

        let started = Instant::now();
        let result = engine.run(&command);
        assert!(matches!(result, Err(EditError::Timeout { .. })));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_shutdown_signal_cancels() {
        let signal = Arc::new(AtomicBool::new(true));
        let engine = FfmpegEngine::new(
            EngineConfig {
                ffmpeg: PathBuf::from("sh"),
                ffprobe: PathBuf::from("sh"),
                timeout: None,
            },
            signal,
        );
        let command = FfmpegCommand::bare(Path::new("sh"), "trim").args(["-c", "exec sleep 5"]);
        assert!(matches!(engine.run(&command), Err(EditError::Cancelled)));
    }

    #[cfg(unix)]
    #[test]
    fn test_stdout_is_captured() {
        let engine = engine_with("sh", None);
        let command =
            FfmpegCommand::bare(Path::new("sh"), "luma sample").args(["-c", "printf abc"]);
        let output = engine.run(&command).unwrap();
        assert_eq!(output.stdout, b"abc");
    }
}
