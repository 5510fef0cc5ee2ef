use super::ffmpeg_command::FfmpegCommand;
use super::thumbnail_extractor::{TILE_HEIGHT, TILE_WIDTH};
use crate::error::{EditError, EditResult};
use log::debug;
use std::path::{Path, PathBuf};

/// 使用 ffmpeg xstack 濾鏡把格子畫面合併為一張預覽圖
///
/// 每張輸入都必須是 `TILE_WIDTH` x `TILE_HEIGHT`，
/// 只有一格時直接轉存第一張。
pub fn grid_command(
    ffmpeg: &Path,
    frames: &[PathBuf],
    rows: usize,
    cols: usize,
    output: &Path,
) -> EditResult<FfmpegCommand> {
    let expected_count = rows * cols;
    if expected_count == 0 {
        return Err(EditError::Config("預覽圖格數必須大於 0".to_string()));
    }
    if frames.len() < expected_count {
        return Err(EditError::engine_output(
            "grid",
            format!("畫面數量不足: 需要 {expected_count} 張，只有 {} 張", frames.len()),
        ));
    }

    debug!("合併 {expected_count} 張畫面為 {cols}x{rows} 預覽圖");

    let mut cmd = FfmpegCommand::new(ffmpeg, "grid").args(["-loglevel", "error"]);

    for frame in frames.iter().take(expected_count) {
        cmd = cmd.arg("-i").arg(frame);
    }

    if expected_count > 1 {
        let layout = build_xstack_layout(cols, rows);
        cmd = cmd
            .arg("-filter_complex")
            .arg(format!("xstack=inputs={expected_count}:layout={layout}"));
    }

    Ok(cmd.args(["-frames:v", "1", "-y"]).arg(output))
}

/// 建立 xstack 佈局字串
///
/// 每個位置格式為 `x_y`，以 `|` 分隔，
/// 例如 2x2 網格：`0_0|320_0|0_180|320_180`
fn build_xstack_layout(cols: usize, rows: usize) -> String {
    let mut positions = Vec::with_capacity(cols * rows);

    for row in 0..rows {
        for col in 0..cols {
            let x = col as u32 * TILE_WIDTH;
            let y = row as u32 * TILE_HEIGHT;
            positions.push(format!("{x}_{y}"));
        }
    }

    positions.join("|")
}

/// 在影片全長上平均取樣，作為預覽圖各格的時間點
///
/// 取每段的中點，避開片頭第一格與片尾結束畫面。
#[must_use]
pub fn grid_timestamps(duration: f64, count: usize) -> Vec<f64> {
    if count == 0 || duration <= 0.0 {
        return Vec::new();
    }

    let step = duration / count as f64;
    (0..count).map(|i| (i as f64 + 0.5) * step).collect()
}
