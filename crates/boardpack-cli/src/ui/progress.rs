//! Spinner and download progress formatting.

use std::time::Instant;

use super::theme::{Icons, format_size};

/// Time-based blinking indicator for in-flight rows.
#[derive(Debug, Clone)]
pub struct Spinner {
    start: Instant,
    icons: Icons,
}

impl Spinner {
    pub fn new(icons: Icons) -> Self {
        Self {
            start: Instant::now(),
            icons,
        }
    }

    /// 200ms per frame, alternating active/pending.
    pub fn current_icon(&self) -> &'static str {
        if (self.start.elapsed().as_millis() / 200) % 2 == 0 {
            self.icons.active
        } else {
            self.icons.pending
        }
    }
}

/// `▓▓▓░░░  42%  1.2 MB`, or a byte count alone when the total is unknown.
pub fn format_download_progress(current: u64, total: Option<u64>, width: usize) -> String {
    match total.filter(|t| *t > 0) {
        Some(total) => {
            let pct = (current.saturating_mul(100) / total).min(100);
            let bar = format_progress_bar(current, total, width);
            format!("{bar}  {pct:>3}%  {}", format_size(total))
        }
        None => format!("fetching  {}", format_size(current)),
    }
}

pub fn format_progress_bar(current: u64, total: u64, width: usize) -> String {
    let filled = if total > 0 {
        (((current as f64 / total as f64) * width as f64).round() as usize).min(width)
    } else {
        0
    };
    format!("{}{}", "▓".repeat(filled), "░".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar() {
        assert_eq!(format_progress_bar(0, 100, 4), "░░░░");
        assert_eq!(format_progress_bar(50, 100, 4), "▓▓░░");
        assert_eq!(format_progress_bar(100, 100, 4), "▓▓▓▓");
        assert_eq!(format_progress_bar(500, 100, 4), "▓▓▓▓");
    }

    #[test]
    fn test_download_progress() {
        let s = format_download_progress(512, Some(1024), 4);
        assert!(s.contains(" 50%"));
        assert!(s.contains("1.0 KB"));

        let unknown = format_download_progress(2048, None, 4);
        assert_eq!(unknown, "fetching  2.0 KB");
    }
}
