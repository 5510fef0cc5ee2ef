use super::silence::complement_of_silence;
use crate::component::scene_split::{Segment, total_duration};
use crate::config::SilenceSettings;
use crate::error::{EditError, EditResult};
use crate::tools::{
    MediaEngine, ScratchSpace, ensure_directory_exists, step_progress, validate_input_file,
    video_extension, video_stem,
};
use log::info;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SilenceRemovalSummary {
    pub video: PathBuf,
    pub original_duration: f64,
    pub silences_found: usize,
    pub kept_intervals: Vec<Segment>,
    pub kept_duration: f64,
    pub output_file: PathBuf,
    pub copied_without_reencode: bool,
}

/// 移除靜音段落
pub struct SilenceRemover<'a> {
    engine: &'a dyn MediaEngine,
    settings: SilenceSettings,
    show_progress: bool,
}

impl<'a> SilenceRemover<'a> {
    #[must_use]
    pub fn new(engine: &'a dyn MediaEngine, settings: SilenceSettings) -> Self {
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

    /// 偵測靜音並輸出只含保留區間的影片
    ///
    /// 沒有任何靜音時直接複製原檔；靜音涵蓋整段影片時回傳 `EmptyResult`。
    pub fn run(&self, video: &Path, output: &Path) -> EditResult<SilenceRemovalSummary> {
        validate_input_file(video)?;

        let duration = self.engine.probe_duration(video)?;
        let silences = self.engine.detect_silence(
            video,
            self.settings.noise_db,
            self.settings.min_silence,
        )?;
        let keeps = complement_of_silence(&silences, duration, self.settings.padding);

        info!(
            "找到 {} 段靜音，保留 {} 個區間: {}",
            silences.len(),
            keeps.len(),
            video.display()
        );

        // 整段都是靜音時沒有可輸出的內容
        if !silences.is_empty() && keeps.is_empty() {
            return Err(EditError::EmptyResult {
                stage: "silence".to_string(),
                original_count: silences.len(),
                threshold: self.settings.noise_db,
            });
        }

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_directory_exists(parent)?;
        }

        let copied_without_reencode = silences.is_empty();
        if copied_without_reencode {
            fs::copy(video, output)?;
            info!("未偵測到靜音，直接複製: {}", output.display());
        } else {
            self.render(video, &keeps, output)?;
            info!("已輸出去除靜音的影片: {}", output.display());
        }

        Ok(SilenceRemovalSummary {
            video: video.to_path_buf(),
            original_duration: duration,
            silences_found: silences.len(),
            kept_duration: total_duration(&keeps),
            kept_intervals: keeps,
            output_file: output.to_path_buf(),
            copied_without_reencode,
        })
    }

    fn render(&self, video: &Path, keeps: &[Segment], output: &Path) -> EditResult<()> {
        let parent = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let mut scratch = ScratchSpace::create(parent, &video_stem(video))?;

        let result = self.trim_keeps(video, keeps, &scratch).and_then(|clips| {
            let manifest = scratch.file("manifest", 0, "txt");
            self.engine.concatenate(&clips, &manifest, output)
        });

        scratch.cleanup();
        result
    }

    fn trim_keeps(
        &self,
        video: &Path,
        keeps: &[Segment],
        scratch: &ScratchSpace,
    ) -> EditResult<Vec<PathBuf>> {
        let extension = video_extension(video);
        let progress_bar = step_progress(keeps.len(), "切出保留區間", self.show_progress);

        let mut clips = Vec::with_capacity(keeps.len());
        for (i, keep) in keeps.iter().enumerate() {
            let clip = scratch.file("keep", i, &extension);
            self.engine
                .trim(video, keep.start, keep.duration, &clip)
                .inspect_err(|_| progress_bar.abandon())?;
            clips.push(clip);
            progress_bar.inc(1);
        }

        progress_bar.finish_and_clear();
        Ok(clips)
    }
}
