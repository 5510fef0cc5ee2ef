//! 流程整合測試 - 以假的 MediaEngine 驅動各剪輯流程
//!
//! 假引擎只寫出佔位檔並記錄呼叫，不需要 ffmpeg。

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use auto_scene_edit::EditError;
use auto_scene_edit::component::scene_split::SceneEditor;
use auto_scene_edit::component::silence_removal::{SilenceInterval, SilenceRemover};
use auto_scene_edit::component::thumbnail::ThumbnailGenerator;
use auto_scene_edit::config::{SceneSettings, ScorerKind, SilenceSettings, ThumbnailSettings};
use auto_scene_edit::error::EditResult;
use auto_scene_edit::tools::{FrameRequest, MediaEngine, PreviewRequest, VideoInfo};
use tempfile::TempDir;

struct FakeEngine {
    info: VideoInfo,
    scans: Mutex<VecDeque<Vec<f64>>>,
    silences: Vec<SilenceInterval>,
    fail_trim_at: Option<usize>,
    fail_concat: bool,
    fail_output_containing: Option<&'static str>,
    scan_thresholds: Mutex<Vec<f64>>,
    trims: Mutex<Vec<(f64, f64, PathBuf)>>,
    frames: Mutex<Vec<f64>>,
    calls: Mutex<usize>,
}

impl FakeEngine {
    fn new(duration: f64) -> Self {
        Self {
            info: VideoInfo {
                width: 1920,
                height: 1080,
                duration,
                fps: 30.0,
            },
            scans: Mutex::new(VecDeque::new()),
            silences: Vec::new(),
            fail_trim_at: None,
            fail_concat: false,
            fail_output_containing: None,
            scan_thresholds: Mutex::new(Vec::new()),
            trims: Mutex::new(Vec::new()),
            frames: Mutex::new(Vec::new()),
            calls: Mutex::new(0),
        }
    }

    fn with_scans(self, scans: &[&[f64]]) -> Self {
        *self.scans.lock().unwrap() = scans.iter().map(|s| s.to_vec()).collect();
        self
    }

    fn record_call(&self) {
        *self.calls.lock().unwrap() += 1;
    }

    fn write_output(&self, output: &Path) -> EditResult<()> {
        let name = output.file_name().unwrap().to_string_lossy().to_string();
        if let Some(pattern) = self.fail_output_containing
            && name.contains(pattern)
        {
            return Err(EditError::EngineInvocation {
                operation: "fake".to_string(),
                status: "exit status: 1".to_string(),
                stderr_tail: format!("No such filter for {name}"),
            });
        }
        fs::write(output, b"fake")?;
        Ok(())
    }
}

impl MediaEngine for FakeEngine {
    fn probe(&self, _video: &Path) -> EditResult<VideoInfo> {
        self.record_call();
        Ok(self.info)
    }

    fn probe_duration(&self, _video: &Path) -> EditResult<f64> {
        self.record_call();
        Ok(self.info.duration)
    }

    fn scan_for_changes(&self, _video: &Path, threshold: f64) -> EditResult<Vec<f64>> {
        self.record_call();
        self.scan_thresholds.lock().unwrap().push(threshold);
        Ok(self.scans.lock().unwrap().pop_front().unwrap_or_default())
    }

    fn detect_silence(
        &self,
        _video: &Path,
        _noise_db: f64,
        _min_silence: f64,
    ) -> EditResult<Vec<SilenceInterval>> {
        self.record_call();
        Ok(self.silences.clone())
    }

    fn trim(&self, _video: &Path, start: f64, duration: f64, output: &Path) -> EditResult<()> {
        self.record_call();
        let index = {
            let mut trims = self.trims.lock().unwrap();
            trims.push((start, duration, output.to_path_buf()));
            trims.len()
        };
        if self.fail_trim_at == Some(index) {
            return Err(EditError::EngineInvocation {
                operation: "trim".to_string(),
                status: "exit status: 1".to_string(),
                stderr_tail: "Conversion failed!".to_string(),
            });
        }
        self.write_output(output)
    }

    fn concatenate(&self, clips: &[PathBuf], manifest: &Path, output: &Path) -> EditResult<()> {
        self.record_call();
        assert!(clips.iter().all(|clip| clip.exists()), "串接前片段必須存在");
        assert!(clips.iter().all(|clip| clip.is_absolute()), "片段路徑必須是絕對路徑");
        fs::write(manifest, format!("{clips:?}"))?;
        if self.fail_concat {
            return Err(EditError::EngineInvocation {
                operation: "concat".to_string(),
                status: "exit status: 1".to_string(),
                stderr_tail: "Invalid data found".to_string(),
            });
        }
        self.write_output(output)
    }

    fn extract_frame(&self, _video: &Path, request: &FrameRequest, output: &Path) -> EditResult<()> {
        self.record_call();
        self.frames.lock().unwrap().push(request.timestamp);
        self.write_output(output)
    }

    fn build_animated_preview(
        &self,
        _video: &Path,
        _request: &PreviewRequest,
        output: &Path,
    ) -> EditResult<()> {
        self.record_call();
        self.write_output(output)
    }

    fn build_grid(
        &self,
        frames: &[PathBuf],
        rows: usize,
        cols: usize,
        output: &Path,
    ) -> EditResult<()> {
        self.record_call();
        assert_eq!(frames.len(), rows * cols);
        self.write_output(output)
    }

    fn sample_luma(&self, _video: &Path, timestamp: f64) -> EditResult<Vec<u8>> {
        self.record_call();
        // 越接近 60% 位置的畫面對比越高
        let spread = (255.0 - (timestamp / self.info.duration - 0.6).abs() * 400.0).max(1.0);
        Ok((0..64 * 36)
            .map(|i| ((i % 2) as f64 * spread) as u8)
            .collect())
    }
}

struct Workspace {
    dir: TempDir,
    video: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        fs::write(&video, b"source video").unwrap();
        Self { dir, video }
    }

    fn out_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    /// 輸出資料夾中殘留的隱藏暫存資料夾
    fn scratch_leftovers(&self) -> Vec<PathBuf> {
        [self.dir.path().to_path_buf(), self.out_dir()]
            .iter()
            .filter(|dir| dir.exists())
            .flat_map(|dir| fs::read_dir(dir).unwrap())
            .map(|entry| entry.unwrap().path())
            .filter(|path| {
                path.file_name()
                    .is_some_and(|name| name.to_string_lossy().starts_with('.'))
            })
            .collect()
    }
}

fn assert_close(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-6, "{a} != {b}");
}

#[test]
fn test_auto_reports_scenes_and_clips() {
    let ws = Workspace::new();
    let engine = FakeEngine::new(35.05).with_scans(&[&[15.2, 30.0]]);
    let editor = SceneEditor::new(&engine, SceneSettings::default());

    let summary = editor.auto(&ws.video, &ws.out_dir()).unwrap();

    assert_eq!(summary.scenes_detected, 2);
    assert_eq!(summary.clips_created, 3);
    assert_eq!(summary.clips_merged, 3);
    assert!(!summary.used_fallback);
    assert_close(summary.original_duration, 35.05);
    assert_close(summary.merged_duration, 35.05);

    for n in 1..=3 {
        let clip = ws.out_dir().join(format!("clip_scene_{n:03}.mp4"));
        assert!(clip.exists(), "缺少 {}", clip.display());
    }
    assert_eq!(summary.merged_file, ws.out_dir().join("clip_merged.mp4"));
    assert!(summary.merged_file.exists());
    assert!(ws.scratch_leftovers().is_empty());

    let trims = engine.trims.lock().unwrap();
    assert_close(trims[1].0, 15.2);
    assert_close(trims[1].1, 14.8);

    let document = serde_json::to_value(&summary).unwrap();
    assert_eq!(document["scenesDetected"], 2);
    assert_eq!(document["clipsCreated"], 3);
    assert!(document.get("mergedFile").is_some());
}

#[test]
fn test_auto_retries_once_with_fallback_threshold() {
    let ws = Workspace::new();
    let engine = FakeEngine::new(30.0).with_scans(&[&[], &[12.0]]);
    let editor = SceneEditor::new(&engine, SceneSettings::default());

    let summary = editor.auto(&ws.video, &ws.out_dir()).unwrap();

    assert!(summary.used_fallback);
    assert_close(summary.threshold_used, 0.15);
    assert_eq!(summary.scenes_detected, 1);
    assert_eq!(*engine.scan_thresholds.lock().unwrap(), vec![0.3, 0.15]);
}

#[test]
fn test_auto_without_any_change_is_single_scene() {
    let ws = Workspace::new();
    let engine = FakeEngine::new(30.0);
    let editor = SceneEditor::new(&engine, SceneSettings::default());

    let summary = editor.auto(&ws.video, &ws.out_dir()).unwrap();

    assert_eq!(summary.scenes_detected, 0);
    assert_eq!(summary.clips_created, 1);
    assert_eq!(engine.scan_thresholds.lock().unwrap().len(), 2);
}

#[test]
fn test_merge_drops_short_segments_and_cleans_scratch() {
    let ws = Workspace::new();
    let engine = FakeEngine::new(20.0).with_scans(&[&[1.0, 10.0]]);
    let editor = SceneEditor::new(&engine, SceneSettings::default());
    let output = ws.out_dir().join("merged.mp4");

    let result = editor.merge(&ws.video, &output).unwrap();

    assert_eq!(result.original_segments, 3);
    assert_eq!(result.kept_segments.len(), 2);
    assert_close(result.merged_duration, 19.0);
    assert!(output.exists());
    assert_eq!(engine.trims.lock().unwrap().len(), 2);
    assert!(ws.scratch_leftovers().is_empty());
}

#[test]
fn test_merge_all_short_is_empty_result() {
    let ws = Workspace::new();
    let engine = FakeEngine::new(4.0).with_scans(&[&[1.0, 2.0, 3.0]]);
    let editor = SceneEditor::new(&engine, SceneSettings::default());

    let result = editor.merge(&ws.video, &ws.out_dir().join("merged.mp4"));

    match result {
        Err(err @ EditError::EmptyResult { original_count, .. }) => {
            assert_eq!(original_count, 4);
            assert!(err.is_recoverable());
        }
        other => panic!("預期 EmptyResult，實際: {other:?}"),
    }
    assert!(engine.trims.lock().unwrap().is_empty());
}

#[test]
fn test_merge_cleans_scratch_when_concat_fails() {
    let ws = Workspace::new();
    let mut engine = FakeEngine::new(20.0).with_scans(&[&[10.0]]);
    engine.fail_concat = true;
    let editor = SceneEditor::new(&engine, SceneSettings::default());

    let result = editor.merge(&ws.video, &ws.out_dir().join("merged.mp4"));

    assert!(matches!(result, Err(EditError::EngineInvocation { .. })));
    assert!(ws.scratch_leftovers().is_empty());
}

#[test]
fn test_split_aborts_and_keeps_finished_clips() {
    let ws = Workspace::new();
    let mut engine = FakeEngine::new(30.0).with_scans(&[&[10.0, 20.0]]);
    engine.fail_trim_at = Some(2);
    let editor = SceneEditor::new(&engine, SceneSettings::default());

    let result = editor.split(&ws.video, &ws.out_dir());

    match result {
        Err(EditError::SplitAborted {
            index, completed, ..
        }) => {
            assert_eq!(index, 2);
            assert_eq!(completed, 1);
        }
        other => panic!("預期 SplitAborted，實際: {other:?}"),
    }
    assert!(ws.out_dir().join("clip_scene_001.mp4").exists());
    assert!(!ws.out_dir().join("clip_scene_003.mp4").exists());
    assert_eq!(engine.trims.lock().unwrap().len(), 2);
}

#[test]
fn test_missing_input_never_calls_engine() {
    let ws = Workspace::new();
    let engine = FakeEngine::new(30.0);
    let editor = SceneEditor::new(&engine, SceneSettings::default());

    let result = editor.detect(&ws.dir.path().join("missing.mp4"));

    assert!(matches!(result, Err(EditError::InputNotFound(_))));
    assert_eq!(*engine.calls.lock().unwrap(), 0);
}

#[test]
fn test_silence_free_video_is_copied() {
    let ws = Workspace::new();
    let engine = FakeEngine::new(20.0);
    let remover = SilenceRemover::new(&engine, SilenceSettings::default());
    let output = ws.out_dir().join("clip_nosilence.mp4");

    let summary = remover.run(&ws.video, &output).unwrap();

    assert!(summary.copied_without_reencode);
    assert_eq!(summary.silences_found, 0);
    assert_close(summary.kept_duration, 20.0);
    assert_eq!(fs::read(&output).unwrap(), b"source video");
    assert!(engine.trims.lock().unwrap().is_empty());
}

#[test]
fn test_silence_removal_trims_keep_intervals() {
    let ws = Workspace::new();
    let mut engine = FakeEngine::new(20.0);
    engine.silences = vec![
        SilenceInterval::closed(0.0, 2.0),
        SilenceInterval::closed(10.0, 10.4),
    ];
    let remover = SilenceRemover::new(&engine, SilenceSettings::default());
    let output = ws.out_dir().join("clip_nosilence.mp4");

    let summary = remover.run(&ws.video, &output).unwrap();

    assert!(!summary.copied_without_reencode);
    assert_eq!(summary.kept_intervals.len(), 2);
    let trims = engine.trims.lock().unwrap();
    assert_close(trims[0].0, 1.9);
    assert_close(trims[0].1, 8.2);
    assert_close(trims[1].0, 10.3);
    assert_close(trims[1].1, 9.7);
    assert!(output.exists());
    assert!(ws.scratch_leftovers().is_empty());
}

#[test]
fn test_fully_silent_video_is_empty_result() {
    let ws = Workspace::new();
    let mut engine = FakeEngine::new(20.0);
    engine.silences = vec![SilenceInterval::open(0.0)];
    let remover = SilenceRemover::new(&engine, SilenceSettings::default());
    let output = ws.out_dir().join("clip_nosilence.mp4");

    let result = remover.run(&ws.video, &output);

    match result {
        Err(err @ EditError::EmptyResult { original_count, .. }) => {
            assert_eq!(original_count, 1);
            assert!(err.is_recoverable());
        }
        other => panic!("預期 EmptyResult，實際: {other:?}"),
    }
    assert!(engine.trims.lock().unwrap().is_empty());
    assert!(!output.exists());
    assert!(ws.scratch_leftovers().is_empty());
}

#[test]
fn test_thumbnail_all_reports_partial_failure() {
    let ws = Workspace::new();
    let mut engine = FakeEngine::new(60.0);
    engine.fail_output_containing = Some("storyboard");
    let generator = ThumbnailGenerator::new(&engine, ThumbnailSettings::default());

    let report = generator.all(&ws.video, &ws.out_dir()).unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.succeeded, 9);
    assert!(report.is_partial());
    assert_eq!(report.artifacts.get("storyboard"), Some(&None));
    assert!(report.failures.contains_key("storyboard"));

    for label in [
        "thumb_320",
        "thumb_640",
        "thumb_1280",
        "timeline",
        "preview_start",
        "preview_middle",
        "preview_end",
        "first",
        "last",
    ] {
        let path = report.artifacts[label].as_ref().unwrap();
        assert!(path.exists(), "缺少 {label}");
    }
    assert!(
        ws.out_dir().join("clip_preview_middle.gif").exists(),
        "GIF 預覽命名錯誤"
    );
    assert!(ws.scratch_leftovers().is_empty());

    let best = report.best_timestamp.unwrap();
    assert!((6.0..=54.0).contains(&best));
}

#[test]
fn test_best_thumbnail_with_reference_scorer() {
    let ws = Workspace::new();
    let engine = FakeEngine::new(40.0);
    let settings = ThumbnailSettings {
        scorer: ScorerKind::Reference,
        candidates: 1,
        ..ThumbnailSettings::default()
    };
    let generator = ThumbnailGenerator::new(&engine, settings);

    let best = generator.best(&ws.video, &ws.out_dir()).unwrap();

    assert_close(best.timestamp, 20.0);
    assert_eq!(best.thumbnails.len(), 3);
    assert!(ws.out_dir().join("clip_thumb_640.jpg").exists());
    let frames = engine.frames.lock().unwrap();
    assert_eq!(frames.len(), 3);
    frames.iter().for_each(|&t| assert_close(t, 20.0));
}

#[test]
fn test_edges_use_first_and_last_frames() {
    let ws = Workspace::new();
    let engine = FakeEngine::new(12.0);
    let generator = ThumbnailGenerator::new(&engine, ThumbnailSettings::default());

    let edges = generator.edges(&ws.video, &ws.out_dir()).unwrap();

    assert_eq!(edges.first, ws.out_dir().join("clip_first.jpg"));
    assert_eq!(edges.last, ws.out_dir().join("clip_last.jpg"));
    assert_eq!(*engine.frames.lock().unwrap(), vec![0.0, 11.5]);
}
