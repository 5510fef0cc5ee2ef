use crate::config::ScorerKind;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "auto_scene_edit")]
#[command(about = "以 ffmpeg 進行場景切割、合併、去除靜音與縮圖產生")]
#[command(version)]
pub struct Cli {
    /// 設定檔路徑（預設為工作目錄下的 settings.json）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// 顯示除錯日誌
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 不顯示進度條
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// 單一 ffmpeg 命令的逾時秒數（0 表示不限制）
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 偵測場景變換點
    Detect {
        video: PathBuf,
        /// 場景變換門檻 (0-1)
        threshold: Option<f64>,
    },
    /// 依場景切割為多個片段
    Split {
        video: PathBuf,
        /// 輸出資料夾（預設為影片所在資料夾）
        output_dir: Option<PathBuf>,
        threshold: Option<f64>,
    },
    /// 移除過短片段後合併為單一影片
    Merge {
        video: PathBuf,
        /// 輸出檔案（預設為 <名稱>_merged.<副檔名>）
        output: Option<PathBuf>,
        threshold: Option<f64>,
        /// 保留片段的最短長度（秒）
        min_duration: Option<f64>,
    },
    /// 偵測、切割並合併
    Auto {
        video: PathBuf,
        output_dir: Option<PathBuf>,
        threshold: Option<f64>,
        min_duration: Option<f64>,
    },
    /// 移除靜音段落
    Silence(SilenceArgs),
    /// 顯示影片資訊
    Info { video: PathBuf },
    /// 產生縮圖
    #[command(subcommand)]
    Thumbnail(ThumbnailCommand),
    /// 設定檔管理
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Debug)]
pub struct SilenceArgs {
    pub video: PathBuf,

    /// 輸出檔案（預設為 <名稱>_nosilence.<副檔名>）
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 視為靜音的音量上限 (dB)
    #[arg(long, allow_hyphen_values = true)]
    pub noise_db: Option<f64>,

    /// 最短靜音長度（秒）
    #[arg(long)]
    pub min_silence: Option<f64>,

    /// 保留區間兩端的緩衝（秒）
    #[arg(long)]
    pub padding: Option<f64>,
}

#[derive(Args, Debug)]
pub struct ThumbnailArgs {
    pub video: PathBuf,

    /// 輸出資料夾（預設為影片所在資料夾）
    pub output_dir: Option<PathBuf>,

    /// 最佳畫面的候選數量
    #[arg(long)]
    pub candidates: Option<usize>,

    /// 評分方式
    #[arg(long, value_enum)]
    pub scorer: Option<ScorerKind>,

    /// 平行工作數
    #[arg(long)]
    pub workers: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum ThumbnailCommand {
    /// 最佳畫面，輸出多種寬度
    Best(ThumbnailArgs),
    /// 格狀預覽圖
    Storyboard(ThumbnailArgs),
    /// 標註時間碼的格狀預覽圖
    Timeline(ThumbnailArgs),
    /// GIF 預覽（20% / 50% / 80%）
    Preview(ThumbnailArgs),
    /// 第一格與最後一格畫面
    Edges(ThumbnailArgs),
    /// 全部縮圖
    All(ThumbnailArgs),
}

impl ThumbnailCommand {
    #[must_use]
    pub const fn args(&self) -> &ThumbnailArgs {
        match self {
            Self::Best(args)
            | Self::Storyboard(args)
            | Self::Timeline(args)
            | Self::Preview(args)
            | Self::Edges(args)
            | Self::All(args) => args,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Best(_) => "best",
            Self::Storyboard(_) => "storyboard",
            Self::Timeline(_) => "timeline",
            Self::Preview(_) => "preview",
            Self::Edges(_) => "edges",
            Self::All(_) => "all",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 顯示目前生效的設定
    Show,
    /// 寫出預設設定檔
    Init {
        /// 覆寫既有的設定檔
        #[arg(long)]
        force: bool,
    },
}
