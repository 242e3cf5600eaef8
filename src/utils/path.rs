//! Path helpers: MIME detection and output naming

use std::path::Path;

/// Prefix of every file produced for the filing system
pub const OUTPUT_PREFIX: &str = "EPROC_";

/// MIME type of a video path, derived from its extension.
///
/// Returns an empty string for unknown extensions, the same thing a browser
/// file picker reports.
pub fn mime_from_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" | "qt" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "wmv" => "video/x-ms-wmv",
        "mpg" | "mpeg" => "video/mpeg",
        "3gp" => "video/3gpp",
        "ts" | "mts" | "m2ts" => "video/mp2t",
        "flv" => "video/x-flv",
        _ => "",
    }
}

/// Name of the saved result for a given source name.
///
/// The encoded stream is always MP4, so the extension is replaced.
pub fn output_file_name(source_name: &str) -> String {
    let path = Path::new(source_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "video".to_string());

    format!("{}{}.mp4", OUTPUT_PREFIX, stem)
}
