//! Fixed E-PROC encoding preset and its argument-list form

use serde::Serialize;

use crate::domain::errors::DomainError;

/// Encoder settings handed to the engine.
///
/// The engine contract is an argument list, so the preset converts to and
/// from the ffmpeg flag spelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodePreset {
    pub video_codec: String,
    pub crf: u8,
    pub speed_preset: String,
    pub frame_rate: u32,
    pub audio_codec: String,
    pub audio_bitrate_kbps: u32,
    pub width: u32,
    pub height: u32,
    pub container: String,
}

impl Default for EncodePreset {
    fn default() -> Self {
        Self::eproc()
    }
}

impl EncodePreset {
    /// 720p H.264 at CRF 28, ultrafast, 24 fps, AAC 96k, MP4
    pub fn eproc() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            crf: 28,
            speed_preset: "ultrafast".to_string(),
            frame_rate: 24,
            audio_codec: "aac".to_string(),
            audio_bitrate_kbps: 96,
            width: 1280,
            height: 720,
            container: "mp4".to_string(),
        }
    }

    /// Flags placed between the input and the output file
    pub fn to_args(&self) -> Vec<String> {
        vec![
            "-vcodec".to_string(),
            self.video_codec.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-preset".to_string(),
            self.speed_preset.clone(),
            "-r".to_string(),
            self.frame_rate.to_string(),
            "-acodec".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            format!("{}k", self.audio_bitrate_kbps),
            "-s".to_string(),
            format!("{}x{}", self.width, self.height),
            "-f".to_string(),
            self.container.clone(),
        ]
    }

    /// Read an argument list back into settings.
    ///
    /// Only the flags produced by [`EncodePreset::to_args`] are understood;
    /// anything else is rejected so an in-process engine never silently
    /// ignores a request.
    pub fn from_args(args: &[String]) -> Result<Self, DomainError> {
        let mut preset = Self::eproc();
        let mut iter = args.iter();

        while let Some(flag) = iter.next() {
            let value = iter
                .next()
                .ok_or_else(|| DomainError::BadArgs(format!("Missing value for {}", flag)))?;

            match flag.as_str() {
                "-vcodec" | "-c:v" => preset.video_codec = value.clone(),
                "-crf" => preset.crf = parse_number(flag, value)?,
                "-preset" => preset.speed_preset = value.clone(),
                "-r" => preset.frame_rate = parse_number(flag, value)?,
                "-acodec" | "-c:a" => preset.audio_codec = value.clone(),
                "-b:a" => {
                    let kbps = value.trim_end_matches(['k', 'K']);
                    preset.audio_bitrate_kbps = parse_number(flag, kbps)?;
                }
                "-s" => {
                    let (w, h) = value.split_once('x').ok_or_else(|| {
                        DomainError::BadArgs(format!("Invalid frame size: {}", value))
                    })?;
                    preset.width = parse_number(flag, w)?;
                    preset.height = parse_number(flag, h)?;
                }
                "-f" => preset.container = value.clone(),
                other => {
                    return Err(DomainError::BadArgs(format!("Unsupported flag: {}", other)));
                }
            }
        }

        if preset.crf > 51 {
            return Err(DomainError::BadArgs(format!(
                "CRF value {} is invalid (must be 0-51)",
                preset.crf
            )));
        }

        Ok(preset)
    }
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, DomainError> {
    value
        .parse()
        .map_err(|_| DomainError::BadArgs(format!("Invalid value for {}: {}", flag, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_eproc_args() {
        let args = EncodePreset::eproc().to_args();
        let joined = args.join(" ");
        assert_eq!(
            joined,
            "-vcodec libx264 -crf 28 -preset ultrafast -r 24 -acodec aac -b:a 96k -s 1280x720 -f mp4"
        );
    }

    #[test]
    fn test_from_args_reads_preset() {
        let parsed = EncodePreset::from_args(&EncodePreset::eproc().to_args()).unwrap();
        assert_eq!(parsed, EncodePreset::eproc());
    }

    #[test]
    fn test_from_args_accepts_aliases() {
        let parsed =
            EncodePreset::from_args(&strings(&["-c:v", "libx265", "-s", "640x360"])).unwrap();
        assert_eq!(parsed.video_codec, "libx265");
        assert_eq!((parsed.width, parsed.height), (640, 360));
        assert_eq!(parsed.crf, 28);
    }

    #[test]
    fn test_from_args_rejects_unknown_flag() {
        let err = EncodePreset::from_args(&strings(&["-vf", "scale=2:2"])).unwrap_err();
        assert!(matches!(err, DomainError::BadArgs(_)));
    }

    #[test]
    fn test_from_args_rejects_bad_values() {
        assert!(EncodePreset::from_args(&strings(&["-crf"])).is_err());
        assert!(EncodePreset::from_args(&strings(&["-crf", "80"])).is_err());
        assert!(EncodePreset::from_args(&strings(&["-s", "1280"])).is_err());
        assert!(EncodePreset::from_args(&strings(&["-r", "fast"])).is_err());
    }
}
