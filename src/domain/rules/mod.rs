// Domain rules - E-PROC upload policy

use crate::domain::errors::*;
use crate::domain::model::*;

/// Upload constraints of the E-PROC filing system
pub struct EprocLimits;

impl EprocLimits {
    /// Advisory size limit (50 MB)
    pub const SOFT_LIMIT_BYTES: u64 = 50 * BYTES_PER_MB;
    /// Absolute size limit (200 MB)
    pub const HARD_LIMIT_BYTES: u64 = 200 * BYTES_PER_MB;
    /// The only container accepted without conversion
    pub const PREFERRED_TYPE: &'static str = "video/mp4";
}

/// Suggested actions shown to the user
pub mod actions {
    pub const UPLOAD_DIRECTLY: &str = "Carregar Diretamente";
    pub const CONVERT_AND_COMPRESS: &str = "Converter e Compactar";
    pub const COMPRESSION_RECOMMENDED: &str = "Compressão Recomendada";
    pub const COMPRESSION_REQUIRED: &str = "Compressão Obrigatória";
}

pub fn is_under_soft_limit(size_bytes: u64) -> bool {
    size_bytes <= EprocLimits::SOFT_LIMIT_BYTES
}

pub fn is_under_hard_limit(size_bytes: u64) -> bool {
    size_bytes <= EprocLimits::HARD_LIMIT_BYTES
}

/// Whether a MIME type names a video (the drop target only takes videos)
pub fn is_video_mime(mime_type: &str) -> bool {
    mime_type.starts_with("video/")
}

/// Static compliance check against the E-PROC limits
pub struct ComplianceChecker;

impl ComplianceChecker {
    /// Evaluate a file description.
    ///
    /// Format is checked before size: a small AVI is reported as a format
    /// problem, a large MP4 as a size problem.
    pub fn analyze(
        file_name: &str,
        size_bytes: u64,
        mime_type: &str,
    ) -> Result<ComplianceReport, DomainError> {
        if file_name.trim().is_empty() {
            return Err(DomainError::BadArgs("File name is empty".to_string()));
        }

        let is_mp4 = mime_type == EprocLimits::PREFERRED_TYPE;
        let under_soft = is_under_soft_limit(size_bytes);

        let report = if under_soft && is_mp4 {
            ComplianceReport {
                is_compliant: true,
                message: "O arquivo está dentro dos limites do E-PROC e formato correto."
                    .to_string(),
                suggested_action: actions::UPLOAD_DIRECTLY.to_string(),
            }
        } else if !is_mp4 {
            ComplianceReport {
                is_compliant: false,
                message: format!("Formato inválido ({}). O E-PROC requer MP4.", mime_type),
                suggested_action: actions::CONVERT_AND_COMPRESS.to_string(),
            }
        } else {
            let suggested_action = if is_under_hard_limit(size_bytes) {
                actions::COMPRESSION_RECOMMENDED
            } else {
                actions::COMPRESSION_REQUIRED
            };
            ComplianceReport {
                is_compliant: false,
                message: format!(
                    "Tamanho ({} MB) excede a preferência de 50MB.",
                    format_megabytes(size_bytes)
                ),
                suggested_action: suggested_action.to_string(),
            }
        };

        Ok(report)
    }
}
