//! Command implementations

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::adapters::FeedStyle;
use crate::app::{AppContainer, DefaultAppContainer};
use crate::cli::args::{CheckArgs, CompressArgs};
use crate::domain::model::{ComplianceReport, SessionState, SourceFile};
use crate::domain::rules::{is_video_mime, ComplianceChecker};

/// File description printed next to a report
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileSummary<'a> {
    name: &'a str,
    size: u64,
    size_mb: String,
    mime_type: &'a str,
}

#[derive(Serialize)]
struct CheckOutput<'a> {
    file: FileSummary<'a>,
    report: &'a ComplianceReport,
}

/// Execute the check command
pub async fn check(args: CheckArgs) -> Result<()> {
    let source = SourceFile::from_path(&args.input, args.mime.as_deref())
        .await
        .with_context(|| format!("Cannot read {}", args.input.display()))?;

    let report = ComplianceChecker::analyze(&source.name, source.size, &source.mime_type)
        .context("Compliance check failed")?;
    info!("Compliance of {}: {}", source.name, report.is_compliant);

    if args.json {
        let output = CheckOutput {
            file: FileSummary {
                name: &source.name,
                size: source.size,
                size_mb: source.size_mb(),
                mime_type: &source.mime_type,
            },
            report: &report,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_report(&source, &report);
    }

    Ok(())
}

fn print_report(source: &SourceFile, report: &ComplianceReport) {
    let mime = if source.mime_type.is_empty() {
        "desconhecido"
    } else {
        source.mime_type.as_str()
    };
    let verdict = if report.is_compliant {
        "CONFORME"
    } else {
        "AÇÃO NECESSÁRIA"
    };

    println!("Arquivo:  {}", source.name);
    println!("Tamanho:  {} MB", source.size_mb());
    println!("Formato:  {}", mime);
    println!("Status:   {}", verdict);
    println!("Análise:  {}", report.message);
    println!("Ação:     {}", report.suggested_action);
}

/// Execute the compress command: the whole session lifecycle for one file
pub async fn compress(args: CompressArgs, container: &DefaultAppContainer) -> Result<()> {
    let source = SourceFile::from_path(&args.input, args.mime.as_deref())
        .await
        .with_context(|| format!("Cannot read {}", args.input.display()))?;

    if !is_video_mime(&source.mime_type) {
        bail!(
            "{} is not a video file (type '{}'); only video files are accepted",
            source.name,
            source.mime_type
        );
    }

    let style = if args.quiet {
        FeedStyle::Quiet
    } else if args.json {
        FeedStyle::Json
    } else {
        FeedStyle::Plain
    };
    let mut controller = container.controller(style);

    controller
        .initialize_engine()
        .await
        .context("Failed to initialize the compression engine")?;
    controller.analyze(source).await?;
    controller
        .start_compression()
        .await
        .context("Compression failed")?;

    let output_dir = &container.config().output_dir;
    let saved = controller
        .save_result(output_dir)
        .with_context(|| format!("Failed to save result in {}", output_dir.display()))?;

    if controller.state() != SessionState::Completed {
        warn!("Session ended in unexpected state {}", controller.state());
    }

    if args.json {
        println!(
            "{}",
            serde_json::json!({ "event": "saved", "path": saved.display().to_string() })
        );
    } else {
        println!("{}", saved.display());
    }
    Ok(())
}

/// Execute the engine command
pub async fn engine(container: &DefaultAppContainer) -> Result<()> {
    let engine = container.engine();
    let backend = engine.backend();
    println!("Backend:  {} ({})", backend, backend.label());

    match engine.load().await {
        Ok(()) => {
            println!("Status:   pronto");
            Ok(())
        }
        Err(e) => {
            println!("Status:   indisponível");
            Err(e).context("Engine is not available")
        }
    }
}
