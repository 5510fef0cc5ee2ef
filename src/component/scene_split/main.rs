use super::scene_detector::should_retry_with_fallback;
use super::segment::{Segment, build_segments, filter_segments, total_duration};
use crate::config::SceneSettings;
use crate::error::{EditError, EditResult};
use crate::tools::{
    MediaEngine, ScratchSpace, derived_file_name, ensure_directory_exists, step_progress,
    validate_input_file, video_extension, video_stem,
};
use log::{info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// 場景偵測結果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub video: PathBuf,
    pub duration: f64,
    pub threshold: f64,
    pub scenes_detected: usize,
    pub change_points: Vec<f64>,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitResult {
    pub video: PathBuf,
    pub scenes_detected: usize,
    pub clips_created: usize,
    pub segments: Vec<Segment>,
    pub clips: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResult {
    pub video: PathBuf,
    pub original_segments: usize,
    pub kept_segments: Vec<Segment>,
    pub min_duration: f64,
    pub merged_file: PathBuf,
    pub merged_duration: f64,
}

/// auto 流程摘要
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoSummary {
    pub video: PathBuf,
    pub original_duration: f64,
    pub threshold_used: f64,
    pub used_fallback: bool,
    pub scenes_detected: usize,
    pub clips_created: usize,
    pub clips: Vec<PathBuf>,
    pub clips_merged: usize,
    pub merged_file: PathBuf,
    pub merged_duration: f64,
}

/// 場景剪輯流程
///
/// detect → 片段整理 → 逐段切割 → 過濾 → 串接。
/// 每一步都等前一步完成後才執行。
pub struct SceneEditor<'a> {
    engine: &'a dyn MediaEngine,
    settings: SceneSettings,
    show_progress: bool,
}

impl<'a> SceneEditor<'a> {
    #[must_use]
    pub fn new(engine: &'a dyn MediaEngine, settings: SceneSettings) -> Self {
        Self {
            engine,
            settings,
            show_progress: false,
        }
    }

    #[must_use]
    pub const fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// 偵測場景變換點
    pub fn detect(&self, video: &Path) -> EditResult<Detection> {
        validate_input_file(video)?;

        let info = self.engine.probe(video)?;
        let threshold = self.settings.threshold;
        let change_points = self.engine.scan_for_changes(video, threshold)?;

        self.detection(video, info.duration, threshold, change_points)
    }

    /// 依場景切割為多個編號片段
    ///
    /// 任一片段失敗即中止，已產生的片段保留在原處。
    pub fn split(&self, video: &Path, output_dir: &Path) -> EditResult<SplitResult> {
        let detection = self.detect(video)?;
        let clips = self.split_segments(video, &detection.segments, output_dir)?;

        Ok(SplitResult {
            video: video.to_path_buf(),
            scenes_detected: detection.scenes_detected,
            clips_created: clips.len(),
            segments: detection.segments,
            clips,
        })
    }

    /// 過濾過短片段後重新串接為單一檔案
    pub fn merge(&self, video: &Path, output: &Path) -> EditResult<MergeResult> {
        let detection = self.detect(video)?;
        let original_segments = detection.segments.len();

        let kept = filter_segments(detection.segments, self.settings.min_duration)?;
        self.merge_segments(video, &kept, output)?;

        Ok(MergeResult {
            video: video.to_path_buf(),
            original_segments,
            merged_duration: total_duration(&kept),
            kept_segments: kept,
            min_duration: self.settings.min_duration,
            merged_file: output.to_path_buf(),
        })
    }

    /// 自動流程：偵測（必要時降低門檻重試一次）、切割、串接
    pub fn auto(&self, video: &Path, output_dir: &Path) -> EditResult<AutoSummary> {
        validate_input_file(video)?;

        let info = self.engine.probe(video)?;
        let mut threshold = self.settings.threshold;
        let mut change_points = self.engine.scan_for_changes(video, threshold)?;
        let mut used_fallback = false;

        if should_retry_with_fallback(&change_points, threshold, self.settings.fallback_threshold)
        {
            warn!(
                "門檻 {threshold} 未偵測到場景變換，改用 {} 重試",
                self.settings.fallback_threshold
            );
            threshold = self.settings.fallback_threshold;
            change_points = self.engine.scan_for_changes(video, threshold)?;
            used_fallback = true;

            if change_points.is_empty() {
                info!("仍未偵測到場景變換，整部影片視為單一場景");
            }
        }

        let detection = self.detection(video, info.duration, threshold, change_points)?;
        let clips = self.split_segments(video, &detection.segments, output_dir)?;

        let kept = filter_segments(detection.segments, self.settings.min_duration)?;
        let merged_file = output_dir.join(derived_file_name(
            video,
            "merged",
            &video_extension(video),
        ));
        self.merge_segments(video, &kept, &merged_file)?;

        let summary = AutoSummary {
            video: video.to_path_buf(),
            original_duration: info.duration,
            threshold_used: threshold,
            used_fallback,
            scenes_detected: detection.scenes_detected,
            clips_created: clips.len(),
            clips,
            clips_merged: kept.len(),
            merged_file,
            merged_duration: total_duration(&kept),
        };

        info!(
            "自動剪輯完成 - 場景: {}, 片段: {}, 合併: {}",
            summary.scenes_detected, summary.clips_created, summary.clips_merged
        );

        Ok(summary)
    }

    fn detection(
        &self,
        video: &Path,
        duration: f64,
        threshold: f64,
        change_points: Vec<f64>,
    ) -> EditResult<Detection> {
        let segments = build_segments(&change_points, duration)?;
        let scenes_detected = segments.len().saturating_sub(1);

        info!(
            "偵測到 {scenes_detected} 個場景變換點（門檻 {threshold}）: {}",
            video.display()
        );

        Ok(Detection {
            video: video.to_path_buf(),
            duration,
            threshold,
            scenes_detected,
            change_points: segments.iter().skip(1).map(|seg| seg.start).collect(),
            segments,
        })
    }

    /// 把每個片段輸出為 `<stem>_scene_NNN.<ext>`
    pub fn split_segments(
        &self,
        video: &Path,
        segments: &[Segment],
        output_dir: &Path,
    ) -> EditResult<Vec<PathBuf>> {
        ensure_directory_exists(output_dir)?;

        let extension = video_extension(video);
        let progress_bar = step_progress(segments.len(), "切割場景", self.show_progress);
        let mut clips = Vec::with_capacity(segments.len());

        for (i, segment) in segments.iter().enumerate() {
            let number = i + 1;
            let clip = output_dir.join(derived_file_name(
                video,
                &format!("scene_{number:03}"),
                &extension,
            ));

            if let Err(e) = self
                .engine
                .trim(video, segment.start, segment.duration, &clip)
            {
                progress_bar.abandon();
                return Err(EditError::SplitAborted {
                    index: number,
                    completed: clips.len(),
                    source: Box::new(e),
                });
            }

            clips.push(clip);
            progress_bar.inc(1);
        }

        progress_bar.finish_and_clear();
        Ok(clips)
    }

    /// 切出片段到暫存區後串接，暫存檔無論成敗都會清除
    pub fn merge_segments(
        &self,
        video: &Path,
        segments: &[Segment],
        output: &Path,
    ) -> EditResult<()> {
        if segments.is_empty() {
            return Err(EditError::EmptyResult {
                stage: "串接".to_string(),
                original_count: 0,
                threshold: self.settings.min_duration,
            });
        }

        let parent = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        ensure_directory_exists(parent)?;

        let mut scratch = ScratchSpace::create(parent, &video_stem(video))?;
        let result = self.trim_and_concatenate(video, segments, output, &scratch);
        scratch.cleanup();

        if result.is_ok() {
            info!("已輸出合併影片: {}", output.display());
        }
        result
    }

    fn trim_and_concatenate(
        &self,
        video: &Path,
        segments: &[Segment],
        output: &Path,
        scratch: &ScratchSpace,
    ) -> EditResult<()> {
        let extension = video_extension(video);
        let progress_bar = step_progress(segments.len(), "切出保留片段", self.show_progress);
        let mut clips = Vec::with_capacity(segments.len());

        for (i, segment) in segments.iter().enumerate() {
            let clip = scratch.file("segment", i, &extension);
            self.engine
                .trim(video, segment.start, segment.duration, &clip)
                .inspect_err(|_| progress_bar.abandon())?;
            clips.push(clip);
            progress_bar.inc(1);
        }
        progress_bar.finish_and_clear();

        let manifest = scratch.file("manifest", 0, "txt");
        self.engine.concatenate(&clips, &manifest, output)
    }
}
