use super::args::{Cli, Command, ConfigCommand, SilenceArgs, ThumbnailArgs, ThumbnailCommand};
use crate::component::{SceneEditor, SilenceRemover, ThumbnailGenerator};
use crate::config::{SETTINGS_FILE_NAME, Settings, save_settings};
use crate::tools::{
    FfmpegEngine, MediaEngine, derived_file_name, output_directory, validate_input_file,
    video_extension,
};
use anyhow::{Context, Result};
use console::Term;
use log::{debug, info};
use serde::Serialize;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// 執行子命令並回傳要輸出到 stdout 的 JSON 文件
pub fn run(cli: Cli, shutdown_signal: &Arc<AtomicBool>) -> Result<Value> {
    let config_path = cli.config.as_deref();

    // 初始化設定檔時不讀取既有設定
    if let Command::Config(ConfigCommand::Init { force }) = cli.command {
        return init_config(config_path, force);
    }

    let mut settings = Settings::load(config_path).context("無法載入設定")?;
    if let Some(seconds) = cli.timeout {
        settings.engine.timeout_seconds = seconds;
    }
    let show_progress = !cli.quiet && Term::stderr().is_term();

    match cli.command {
        Command::Config(_) => to_document(&settings),
        command => {
            let engine = build_engine(&settings, shutdown_signal)?;
            run_media(command, settings, &engine, show_progress)
        }
    }
}

fn build_engine(settings: &Settings, shutdown_signal: &Arc<AtomicBool>) -> Result<FfmpegEngine> {
    let config = settings
        .resolve_engine()
        .context("無法找到 ffmpeg / ffprobe")?;
    debug!(
        "ffmpeg: {}, ffprobe: {}",
        config.ffmpeg.display(),
        config.ffprobe.display()
    );

    Ok(FfmpegEngine::new(config, Arc::clone(shutdown_signal))
        .with_encode(settings.encode.clone())
        .with_analyze_width(settings.scene.analyze_width))
}

/// 需要外部程式的子命令
///
/// 獨立於 `run` 之外，方便以替代的 `MediaEngine` 驅動。
pub fn run_media(
    command: Command,
    mut settings: Settings,
    engine: &dyn MediaEngine,
    show_progress: bool,
) -> Result<Value> {
    match command {
        Command::Detect { video, threshold } => {
            apply_scene_overrides(&mut settings, threshold, None);
            let editor = SceneEditor::new(engine, settings.scene);
            to_document(&editor.detect(&video).context("場景偵測失敗")?)
        }
        Command::Split {
            video,
            output_dir,
            threshold,
        } => {
            apply_scene_overrides(&mut settings, threshold, None);
            let out_dir = output_directory(&video, output_dir.as_deref());
            let editor = SceneEditor::new(engine, settings.scene).with_progress(show_progress);
            to_document(&editor.split(&video, &out_dir).context("場景切割失敗")?)
        }
        Command::Merge {
            video,
            output,
            threshold,
            min_duration,
        } => {
            apply_scene_overrides(&mut settings, threshold, min_duration);
            let output = output.unwrap_or_else(|| default_output(&video, "merged"));
            let editor = SceneEditor::new(engine, settings.scene).with_progress(show_progress);
            to_document(&editor.merge(&video, &output).context("場景合併失敗")?)
        }
        Command::Auto {
            video,
            output_dir,
            threshold,
            min_duration,
        } => {
            apply_scene_overrides(&mut settings, threshold, min_duration);
            let out_dir = output_directory(&video, output_dir.as_deref());
            let editor = SceneEditor::new(engine, settings.scene).with_progress(show_progress);
            to_document(&editor.auto(&video, &out_dir).context("自動剪輯失敗")?)
        }
        Command::Silence(args) => run_silence(args, settings, engine, show_progress),
        Command::Info { video } => {
            validate_input_file(&video)?;
            to_document(&engine.probe(&video).context("無法取得影片資訊")?)
        }
        Command::Thumbnail(command) => run_thumbnail(command, settings, engine),
        Command::Config(_) => anyhow::bail!("config 子命令不需要外部程式"),
    }
}

fn run_silence(
    args: SilenceArgs,
    mut settings: Settings,
    engine: &dyn MediaEngine,
    show_progress: bool,
) -> Result<Value> {
    if let Some(noise_db) = args.noise_db {
        settings.silence.noise_db = noise_db;
    }
    if let Some(min_silence) = args.min_silence {
        settings.silence.min_silence = min_silence;
    }
    if let Some(padding) = args.padding {
        settings.silence.padding = padding;
    }

    let output = args
        .output
        .unwrap_or_else(|| default_output(&args.video, "nosilence"));
    let remover = SilenceRemover::new(engine, settings.silence).with_progress(show_progress);
    to_document(&remover.run(&args.video, &output).context("去除靜音失敗")?)
}

fn run_thumbnail(
    command: ThumbnailCommand,
    mut settings: Settings,
    engine: &dyn MediaEngine,
) -> Result<Value> {
    let args = command.args();
    apply_thumbnail_overrides(&mut settings, args);
    let out_dir = output_directory(&args.video, args.output_dir.as_deref());
    let generator = ThumbnailGenerator::new(engine, settings.thumbnail);
    let video = args.video.as_path();

    info!("產生縮圖 ({}): {}", command.name(), video.display());
    match &command {
        ThumbnailCommand::Best(_) => {
            to_document(&generator.best(video, &out_dir).context("最佳畫面產生失敗")?)
        }
        ThumbnailCommand::Storyboard(_) => {
            let file = generator
                .storyboard(video, &out_dir)
                .context("格狀預覽圖產生失敗")?;
            Ok(json!({ "video": video, "storyboard": file }))
        }
        ThumbnailCommand::Timeline(_) => {
            let file = generator
                .timeline(video, &out_dir)
                .context("時間軸預覽圖產生失敗")?;
            Ok(json!({ "video": video, "timeline": file }))
        }
        ThumbnailCommand::Preview(_) => {
            let previews = generator
                .previews(video, &out_dir)
                .context("GIF 預覽產生失敗")?;
            Ok(json!({ "video": video, "previews": previews }))
        }
        ThumbnailCommand::Edges(_) => {
            to_document(&generator.edges(video, &out_dir).context("首尾畫面產生失敗")?)
        }
        ThumbnailCommand::All(_) => {
            to_document(&generator.all(video, &out_dir).context("縮圖產生失敗")?)
        }
    }
}

fn init_config(path: Option<&Path>, force: bool) -> Result<Value> {
    let path = path.map_or_else(|| PathBuf::from(SETTINGS_FILE_NAME), Path::to_path_buf);
    save_settings(&Settings::default(), &path, force)
        .with_context(|| format!("無法寫入設定檔 {}", path.display()))?;
    info!("已寫入預設設定檔: {}", path.display());
    Ok(json!({ "written": path }))
}

fn apply_scene_overrides(settings: &mut Settings, threshold: Option<f64>, min_duration: Option<f64>) {
    if let Some(threshold) = threshold {
        settings.scene.threshold = threshold;
    }
    if let Some(min_duration) = min_duration {
        settings.scene.min_duration = min_duration;
    }
}

fn apply_thumbnail_overrides(settings: &mut Settings, args: &ThumbnailArgs) {
    if let Some(candidates) = args.candidates {
        settings.thumbnail.candidates = candidates;
    }
    if let Some(scorer) = args.scorer {
        settings.thumbnail.scorer = scorer;
    }
    if let Some(workers) = args.workers {
        settings.thumbnail.workers = workers;
    }
}

/// 影片所在資料夾下的 `<名稱>_<suffix>.<副檔名>`
fn default_output(video: &Path, suffix: &str) -> PathBuf {
    output_directory(video, None).join(derived_file_name(
        video,
        suffix,
        &video_extension(video),
    ))
}

fn to_document<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    serde_json::to_value(value).context("無法輸出 JSON")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_next_to_video() {
        assert_eq!(
            default_output(Path::new("/videos/talk.mkv"), "nosilence"),
            PathBuf::from("/videos/talk_nosilence.mkv")
        );
    }

    #[test]
    fn test_scene_overrides() {
        let mut settings = Settings::default();
        apply_scene_overrides(&mut settings, Some(0.45), None);
        assert!((settings.scene.threshold - 0.45).abs() < f64::EPSILON);
        assert!((settings.scene.min_duration - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_settings_document_shape() {
        let document = to_document(&Settings::default()).unwrap();
        assert_eq!(document["scene"]["threshold"], json!(0.3));
        assert_eq!(document["thumbnail"]["scorer"], json!("luma"));
    }

    #[test]
    fn test_config_init_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        init_config(Some(&path), false).unwrap();
        assert!(path.exists());
        assert!(init_config(Some(&path), false).is_err());
        assert!(init_config(Some(&path), true).is_ok());
    }
}
