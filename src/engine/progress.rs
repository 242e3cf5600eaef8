//! Progress signal handling for the encode run

/// Map an engine progress fraction to a displayed percentage.
///
/// Values are rounded and clamped to 0..=100. Non-finite values carry no
/// information and yield `None`.
pub fn percent_from_ratio(ratio: f64) -> Option<u8> {
    if !ratio.is_finite() {
        return None;
    }
    Some((ratio * 100.0).round().clamp(0.0, 100.0) as u8)
}

/// One line of ffmpeg's `-progress` key=value stream
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressLine {
    /// Output timestamp reached, in seconds
    OutTime(f64),
    /// Block separator, more to come
    Continue,
    /// Encoder finished
    End,
    /// Any other key
    Other,
}

impl ProgressLine {
    pub fn parse(line: &str) -> Self {
        let Some((key, value)) = line.trim().split_once('=') else {
            return ProgressLine::Other;
        };

        match key {
            // out_time_ms is reported in microseconds as well
            "out_time_us" | "out_time_ms" => value
                .parse::<i64>()
                .ok()
                .filter(|us| *us >= 0)
                .map(|us| ProgressLine::OutTime(us as f64 / 1_000_000.0))
                .unwrap_or(ProgressLine::Other),
            "progress" if value == "end" => ProgressLine::End,
            "progress" => ProgressLine::Continue,
            _ => ProgressLine::Other,
        }
    }
}

/// Parse the input duration from an ffmpeg stderr line such as
/// `  Duration: 00:01:23.45, start: 0.000000, bitrate: 1205 kb/s`.
pub fn parse_duration_line(line: &str) -> Option<f64> {
    let rest = line.trim().strip_prefix("Duration:")?;
    let stamp = rest.split(',').next()?.trim();
    parse_clock(stamp)
}

/// Parse `HH:MM:SS(.frac)` into seconds
pub fn parse_clock(stamp: &str) -> Option<f64> {
    let mut parts = stamp.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Fraction done given the output position and the input duration
pub fn ratio_of(out_time: f64, duration: f64) -> Option<f64> {
    if duration > 0.0 {
        Some((out_time / duration).clamp(0.0, 1.0))
    } else {
        None
    }
}
