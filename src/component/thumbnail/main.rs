use super::frame_scorer::{
    CandidateFrame, FrameQuality, LumaScorer, ReferenceScorer, select_best_frame,
};
use crate::config::{ScorerKind, ThumbnailSettings};
use crate::error::{EditError, EditResult};
use crate::tools::{
    FrameRequest, FrameScale, MediaEngine, PreviewRequest, ScratchSpace, TILE_HEIGHT, TILE_WIDTH,
    derived_file_name, ensure_directory_exists, format_timecode, grid_timestamps,
    validate_input_file, video_stem,
};
use log::{error, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

/// 最後一格畫面距離片尾的時間（秒），避免落在結束後的空白
const LAST_FRAME_OFFSET: f64 = 0.5;

/// GIF 預覽的錨點位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewAnchor {
    Start,
    Middle,
    End,
}

impl PreviewAnchor {
    pub const ALL: [Self; 3] = [Self::Start, Self::Middle, Self::End];

    /// 錨點在影片中的比例位置
    #[must_use]
    pub const fn fraction(self) -> f64 {
        match self {
            Self::Start => 0.2,
            Self::Middle => 0.5,
            Self::End => 0.8,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Middle => "middle",
            Self::End => "end",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BestThumbnail {
    pub video: PathBuf,
    pub timestamp: f64,
    pub score: f64,
    pub scorer: ScorerKind,
    pub thumbnails: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewClip {
    pub anchor: PreviewAnchor,
    pub start: f64,
    pub duration: f64,
    pub file: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgeFrames {
    pub first: PathBuf,
    pub last: PathBuf,
}

/// 一次產生全部縮圖的結果
///
/// 個別項目失敗不影響其他項目，失敗項目的路徑為 `null`。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub video: PathBuf,
    pub duration: f64,
    pub best_timestamp: Option<f64>,
    pub artifacts: BTreeMap<String, Option<PathBuf>>,
    pub failures: BTreeMap<String, String>,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchReport {
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.failed > 0 && self.succeeded > 0
    }
}

/// 縮圖批次中的單一工作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ThumbnailJob {
    Still(u32),
    Storyboard,
    Timeline,
    Preview(PreviewAnchor),
    First,
    Last,
}

impl ThumbnailJob {
    fn label(self) -> String {
        match self {
            Self::Still(width) => format!("thumb_{width}"),
            Self::Storyboard => "storyboard".to_string(),
            Self::Timeline => "timeline".to_string(),
            Self::Preview(anchor) => format!("preview_{}", anchor.name()),
            Self::First => "first".to_string(),
            Self::Last => "last".to_string(),
        }
    }

    const fn extension(self) -> &'static str {
        match self {
            Self::Preview(_) => "gif",
            _ => "jpg",
        }
    }
}

/// 單次執行共用的影片資訊
struct VideoContext<'p> {
    video: &'p Path,
    output_dir: &'p Path,
    duration: f64,
}

impl VideoContext<'_> {
    fn output_for(&self, job: ThumbnailJob) -> PathBuf {
        self.output_dir
            .join(derived_file_name(self.video, &job.label(), job.extension()))
    }
}

/// 縮圖產生器
pub struct ThumbnailGenerator<'a> {
    engine: &'a dyn MediaEngine,
    settings: ThumbnailSettings,
}

impl<'a> ThumbnailGenerator<'a> {
    #[must_use]
    pub const fn new(engine: &'a dyn MediaEngine, settings: ThumbnailSettings) -> Self {
        Self { engine, settings }
    }

    /// 選出最佳畫面並輸出各寬度的縮圖
    pub fn best(&self, video: &Path, output_dir: &Path) -> EditResult<BestThumbnail> {
        let duration = self.prepare(video, output_dir)?;
        let ctx = VideoContext {
            video,
            output_dir,
            duration,
        };

        let best = self.select_best(&ctx)?;
        let thumbnails = self
            .settings
            .widths
            .iter()
            .map(|&width| self.render_still(&ctx, best.timestamp, width))
            .collect::<EditResult<Vec<_>>>()?;

        info!(
            "最佳畫面 {:.3}s（分數 {:.1}）: {}",
            best.timestamp,
            best.score,
            video.display()
        );

        Ok(BestThumbnail {
            video: video.to_path_buf(),
            timestamp: best.timestamp,
            score: best.score,
            scorer: self.settings.scorer,
            thumbnails,
        })
    }

    /// 全片平均取樣的格狀預覽圖
    pub fn storyboard(&self, video: &Path, output_dir: &Path) -> EditResult<PathBuf> {
        self.standalone_grid(video, output_dir, ThumbnailJob::Storyboard)
    }

    /// 每格標註時間碼的格狀預覽圖
    pub fn timeline(&self, video: &Path, output_dir: &Path) -> EditResult<PathBuf> {
        self.standalone_grid(video, output_dir, ThumbnailJob::Timeline)
    }

    /// 在 20% / 50% / 80% 位置各產生一段 GIF 預覽
    pub fn previews(&self, video: &Path, output_dir: &Path) -> EditResult<Vec<PreviewClip>> {
        let duration = self.prepare(video, output_dir)?;
        let ctx = VideoContext {
            video,
            output_dir,
            duration,
        };

        PreviewAnchor::ALL
            .iter()
            .map(|&anchor| self.render_preview(&ctx, anchor))
            .collect()
    }

    /// 第一格與最後一格畫面
    pub fn edges(&self, video: &Path, output_dir: &Path) -> EditResult<EdgeFrames> {
        let duration = self.prepare(video, output_dir)?;
        let ctx = VideoContext {
            video,
            output_dir,
            duration,
        };

        Ok(EdgeFrames {
            first: self.render_edge(&ctx, ThumbnailJob::First)?,
            last: self.render_edge(&ctx, ThumbnailJob::Last)?,
        })
    }

    /// 產生全部縮圖
    ///
    /// 先選出最佳畫面，其餘項目交給固定大小的執行緒池平行處理，
    /// 每個工作使用獨立的暫存子目錄。
    pub fn all(&self, video: &Path, output_dir: &Path) -> EditResult<BatchReport> {
        let duration = self.prepare(video, output_dir)?;
        let ctx = VideoContext {
            video,
            output_dir,
            duration,
        };

        let best = match self.select_best(&ctx) {
            Ok(best) => Some(best),
            Err(e) => {
                warn!("無法選出最佳畫面，略過縮圖: {e}");
                None
            }
        };

        let mut jobs: Vec<ThumbnailJob> = self
            .settings
            .widths
            .iter()
            .map(|&width| ThumbnailJob::Still(width))
            .collect();
        jobs.extend([ThumbnailJob::Storyboard, ThumbnailJob::Timeline]);
        jobs.extend(PreviewAnchor::ALL.map(ThumbnailJob::Preview));
        jobs.extend([ThumbnailJob::First, ThumbnailJob::Last]);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.workers.max(1))
            .build()
            .map_err(|e| EditError::Io(io::Error::other(e.to_string())))?;

        let mut scratch = ScratchSpace::create(output_dir, &video_stem(video))?;
        let outcomes: Vec<(String, EditResult<PathBuf>)> = pool.install(|| {
            jobs.par_iter()
                .map(|&job| (job.label(), self.run_job(&ctx, job, best.as_ref(), &scratch)))
                .collect()
        });
        scratch.cleanup();

        let mut artifacts = BTreeMap::new();
        let mut failures = BTreeMap::new();
        for (label, outcome) in outcomes {
            match outcome {
                Ok(path) => {
                    artifacts.insert(label, Some(path));
                }
                Err(e) => {
                    error!("縮圖項目 {label} 失敗: {e}");
                    failures.insert(label.clone(), e.to_string());
                    artifacts.insert(label, None);
                }
            }
        }

        let report = BatchReport {
            video: video.to_path_buf(),
            duration,
            best_timestamp: best.map(|b| b.timestamp),
            succeeded: artifacts.len() - failures.len(),
            failed: failures.len(),
            artifacts,
            failures,
        };

        info!(
            "縮圖完成 - 成功: {}, 失敗: {}",
            report.succeeded, report.failed
        );
        Ok(report)
    }

    fn prepare(&self, video: &Path, output_dir: &Path) -> EditResult<f64> {
        validate_input_file(video)?;
        ensure_directory_exists(output_dir)?;
        Ok(self.engine.probe(video)?.duration)
    }

    fn select_best(&self, ctx: &VideoContext<'_>) -> EditResult<CandidateFrame> {
        let scorer: Box<dyn FrameQuality + '_> = match self.settings.scorer {
            ScorerKind::Luma => Box::new(LumaScorer::new(self.engine, ctx.video, ctx.duration)),
            ScorerKind::Reference => Box::new(ReferenceScorer::new(ctx.duration)),
        };

        select_best_frame(ctx.duration, self.settings.candidates, |t| scorer.score(t))
    }

    fn run_job(
        &self,
        ctx: &VideoContext<'_>,
        job: ThumbnailJob,
        best: Option<&CandidateFrame>,
        scratch: &ScratchSpace,
    ) -> EditResult<PathBuf> {
        match job {
            ThumbnailJob::Still(width) => {
                let best = best.ok_or_else(|| {
                    EditError::engine_output("畫格評分", "沒有可用的候選畫格")
                })?;
                self.render_still(ctx, best.timestamp, width)
            }
            ThumbnailJob::Storyboard | ThumbnailJob::Timeline => {
                let tile_dir = scratch.namespace(&job.label())?;
                self.render_grid(ctx, job, &tile_dir)
            }
            ThumbnailJob::Preview(anchor) => {
                self.render_preview(ctx, anchor).map(|clip| clip.file)
            }
            ThumbnailJob::First | ThumbnailJob::Last => self.render_edge(ctx, job),
        }
    }

    fn render_still(
        &self,
        ctx: &VideoContext<'_>,
        timestamp: f64,
        width: u32,
    ) -> EditResult<PathBuf> {
        let output = ctx.output_for(ThumbnailJob::Still(width));
        let request = FrameRequest::new(timestamp, FrameScale::Width(width), self.settings.quality);
        self.engine.extract_frame(ctx.video, &request, &output)?;
        Ok(output)
    }

    fn standalone_grid(
        &self,
        video: &Path,
        output_dir: &Path,
        job: ThumbnailJob,
    ) -> EditResult<PathBuf> {
        let duration = self.prepare(video, output_dir)?;
        let ctx = VideoContext {
            video,
            output_dir,
            duration,
        };

        let mut scratch = ScratchSpace::create(output_dir, &video_stem(video))?;
        let result = self.render_grid(&ctx, job, scratch.root());
        scratch.cleanup();
        result
    }

    fn render_grid(
        &self,
        ctx: &VideoContext<'_>,
        job: ThumbnailJob,
        tile_dir: &Path,
    ) -> EditResult<PathBuf> {
        let rows = self.settings.grid_rows.max(1);
        let cols = self.settings.grid_cols.max(1);
        let timestamps = grid_timestamps(ctx.duration, rows * cols);
        if timestamps.is_empty() {
            return Err(EditError::InvalidTimestamps(format!(
                "影片長度 {} 無法取樣",
                ctx.duration
            )));
        }

        let labelled = job == ThumbnailJob::Timeline;
        let tiles = timestamps
            .iter()
            .enumerate()
            .map(|(i, &timestamp)| {
                let tile = tile_dir.join(format!("tile_{i:03}.jpg"));
                let mut request = FrameRequest::new(
                    timestamp,
                    FrameScale::Tile {
                        width: TILE_WIDTH,
                        height: TILE_HEIGHT,
                    },
                    self.settings.quality,
                );
                if labelled {
                    request = request.with_label(format_timecode(timestamp));
                }
                self.engine.extract_frame(ctx.video, &request, &tile)?;
                Ok(tile)
            })
            .collect::<EditResult<Vec<_>>>()?;

        let output = ctx.output_for(job);
        self.engine.build_grid(&tiles, rows, cols, &output)?;
        Ok(output)
    }

    fn render_preview(
        &self,
        ctx: &VideoContext<'_>,
        anchor: PreviewAnchor,
    ) -> EditResult<PreviewClip> {
        let (start, duration) =
            preview_window(ctx.duration, anchor.fraction(), self.settings.preview_seconds);
        let request = PreviewRequest {
            start,
            duration,
            width: self.settings.preview_width,
            fps: self.settings.preview_fps,
        };

        let file = ctx.output_for(ThumbnailJob::Preview(anchor));
        self.engine.build_animated_preview(ctx.video, &request, &file)?;

        Ok(PreviewClip {
            anchor,
            start,
            duration,
            file,
        })
    }

    fn render_edge(&self, ctx: &VideoContext<'_>, job: ThumbnailJob) -> EditResult<PathBuf> {
        let timestamp = match job {
            ThumbnailJob::Last => last_frame_timestamp(ctx.duration),
            _ => 0.0,
        };
        let output = ctx.output_for(job);
        let request = FrameRequest::new(timestamp, FrameScale::Original, self.settings.quality);
        self.engine.extract_frame(ctx.video, &request, &output)?;
        Ok(output)
    }
}

/// 以錨點為中心的預覽區段，超出影片範圍時往內平移
fn preview_window(duration: f64, fraction: f64, length: f64) -> (f64, f64) {
    let length = length.max(0.0).min(duration);
    let latest_start = (duration - length).max(0.0);
    let start = (duration * fraction - length / 2.0).clamp(0.0, latest_start);
    (start, length)
}

fn last_frame_timestamp(duration: f64) -> f64 {
    (duration - LAST_FRAME_OFFSET).max(0.0)
}
