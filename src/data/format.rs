//! Human-readable formatting of sizes, rates, counts and durations.

const BYTE_UNITS: [&str; 7] = ["B", "KB", "MB", "GB", "TB", "PB", "EB"];
const SPEED_UNITS: [&str; 5] = ["B/s", "KB/s", "MB/s", "GB/s", "TB/s"];

/// Largest power of 1024 not above `value`, capped at `max_index`.
fn scale(value: u64, max_index: usize) -> (f64, usize) {
    let mut index = 0;
    let mut divisor = 1u64;
    while index < max_index && value / divisor >= 1024 {
        divisor *= 1024;
        index += 1;
    }
    (value as f64 / divisor as f64, index)
}

/// Format a byte count with up to two decimals (e.g., "1.5 KB", "3 GB").
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    let (size, index) = scale(bytes, BYTE_UNITS.len() - 1);
    let text = format!("{:.2}", size);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", text, BYTE_UNITS[index])
}

/// Format a transfer rate in bytes per second.
///
/// Decimals adapt to the magnitude: none for B/s and KB/s, one for GB/s and
/// above, two for MB/s, and none for any value of 100 or more.
pub fn format_speed(bytes_per_sec: u64) -> String {
    if bytes_per_sec == 0 {
        return "0 B/s".to_string();
    }
    let (size, index) = scale(bytes_per_sec, SPEED_UNITS.len() - 1);

    let mut decimals = 2;
    if index >= 3 {
        decimals = 1;
    }
    if index <= 1 {
        decimals = 0;
    }
    if size >= 100.0 {
        decimals = 0;
    }

    format!("{:.*} {}", decimals, size, SPEED_UNITS[index])
}

/// Format a count with thousands separators.
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Format an uptime in seconds using its two most significant units.
pub fn format_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Format a percentage with one decimal.
pub fn format_percent(value: f64) -> String {
    if value.is_finite() {
        format!("{:.1}%", value)
    } else {
        "-".to_string()
    }
}
