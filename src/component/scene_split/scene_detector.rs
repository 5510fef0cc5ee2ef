use log::debug;
use regex::Regex;
use std::sync::LazyLock;

/// auto 流程找不到場景時改用的較低門檻
pub const FALLBACK_THRESHOLD: f64 = 0.15;

/// showinfo 輸出的畫格時間
/// 例如: [Parsed_showinfo_2 @ 0x55d] n:   0 pts:  45600 pts_time:15.2 ...
static SHOWINFO_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"pts_time:\s*(-?[0-9]+(?:\.[0-9]+)?)").expect("Invalid regex"));

/// 解析場景掃描輸出，依出現順序回傳所有時間點
///
/// 只看 showinfo 的行，解碼器或封裝器的其他訊息會被忽略。
/// 排序、去重與範圍檢查由片段整理負責。
#[must_use]
pub fn parse_scene_output(output: &str) -> Vec<f64> {
    let timestamps: Vec<f64> = output
        .lines()
        .filter(|line| line.contains("showinfo"))
        .filter_map(|line| SHOWINFO_TIME.captures(line))
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .filter(|t| *t >= 0.0)
        .collect();

    debug!("場景掃描輸出中找到 {} 個時間點", timestamps.len());
    timestamps
}

/// 本次偵測是否需要改用較低門檻重試
#[must_use]
pub fn should_retry_with_fallback(change_points: &[f64], threshold: f64, fallback: f64) -> bool {
    change_points.is_empty() && fallback < threshold
}
