pub mod config; // Application constants and environment overrides
pub mod pipeline; // Validate → extract → combine → report

use std::path::Path;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use pipeline::extraction::LoggingProgressSink;
use pipeline::validate::UploadedFile;
use pipeline::ProcessedBatch;

/// CLI entry point: read the given documents, run the report pipeline and
/// print the result to stdout. Progress and diagnostics go through the
/// tracing subscriber (stderr), so stdout stays clean for the report itself.
pub fn run() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("docbrief starting v{}", config::APP_VERSION);

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        eprintln!("Usage: docbrief <file>...");
        eprintln!(
            "Reads up to {} TXT/PDF documents and prints a generated report.",
            config::MAX_FILES
        );
        return ExitCode::from(2);
    }

    let files = match load_files(&paths) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let pipeline = pipeline::build_pipeline();
    let sink = LoggingProgressSink::new();

    match runtime.block_on(pipeline.process(&files, &sink)) {
        Ok(batch) => {
            print_report(&batch);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Pipeline failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Read each path into an [`UploadedFile`], guessing the MIME type from the
/// file extension. Unknown extensions fall through as octet-stream and are
/// rejected by validation with a per-file message.
fn load_files(paths: &[String]) -> Result<Vec<UploadedFile>, std::io::Error> {
    paths
        .iter()
        .map(|raw| {
            let path = Path::new(raw);
            let bytes = std::fs::read(path)
                .map_err(|e| std::io::Error::new(e.kind(), format!("{raw}: {e}")))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| raw.clone());
            let mime_type = mime_guess::from_path(path)
                .first_raw()
                .unwrap_or("application/octet-stream");
            Ok(UploadedFile::new(name, mime_type, bytes))
        })
        .collect()
}

fn print_report(batch: &ProcessedBatch) {
    if batch.truncated {
        eprintln!(
            "Warning: combined text exceeded {} characters and was truncated before analysis.",
            config::MAX_COMBINED_CHARS
        );
    }

    let report = &batch.report;
    print_heading("Summary");
    println!("{}", report.summary);
    println!();
    print_list("Key Points", &report.key_points);
    print_list("Insights", &report.insights);
    print_list("Actionable Takeaways", &report.actionable_takeaways);
    println!(
        "{} file(s) | {} words | ~{} min read | sentiment: {}",
        batch.file_count,
        report.word_count,
        report.reading_time,
        report.sentiment.as_str()
    );
}

fn print_heading(title: &str) {
    println!("{title}");
    println!("{}", "-".repeat(title.len()));
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    print_heading(title);
    for item in items {
        println!("- {item}");
    }
    println!();
}
