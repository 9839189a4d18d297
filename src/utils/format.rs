/// Simple ASCII progress bar for a 0..100 percentage.
pub fn progress_bar(percent: f64, width: usize) -> String {
    let ratio = (percent / 100.0).clamp(0.0, 1.0);
    let filled_count = (ratio * width as f64).round() as usize;
    let empty_count = width.saturating_sub(filled_count);
    format!("{}{}", "█".repeat(filled_count), "░".repeat(empty_count))
}

/// "1 day" / "3 days"
pub fn format_days(days: u32) -> String {
    if days == 1 {
        "1 day".to_string()
    } else {
        format!("{} days", days)
    }
}

/// Weight with one decimal, trailing ".0" trimmed.
pub fn format_weight(kg: f64) -> String {
    if kg == kg.floor() {
        format!("{} kg", kg as i64)
    } else {
        format!("{:.1} kg", kg)
    }
}
