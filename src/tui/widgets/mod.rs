pub mod dashboard;
pub mod play;
pub mod song_detail;
pub mod songs;

use std::time::Duration;

pub(crate) fn progress_bar(fraction: f64, width: usize) -> String {
    let filled = ((fraction.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

pub(crate) fn stars(count: u32) -> String {
    let count = count.min(3) as usize;
    format!("{}{}", "★".repeat(count), "☆".repeat(3 - count))
}

pub(crate) fn countdown(wait: Duration) -> String {
    let secs = wait.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

pub(crate) fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
