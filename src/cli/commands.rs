//! Batch translation command: file discovery and per-file driver

use std::path::{Path, PathBuf};
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::core::config::TranslatorConfig;
use crate::processors::docx::DocxTranslator;

/// Run the batch over a single file or a directory of DOCX files.
///
/// Each file moves Pending -> Processing -> Completed/Failed independently;
/// a failed file is reported and the driver continues with the next one.
/// Returns the process exit code: 0 on normal completion (including an
/// empty batch), 1 when the input path does not exist.
pub async fn handle_translate(
    input: PathBuf,
    output_dir: PathBuf,
    config_path: PathBuf,
) -> anyhow::Result<i32> {
    let start_time = Instant::now();

    let config = TranslatorConfig::from_file(&config_path)?;
    info!(
        "Provider: {}, model: {}, {} -> {}",
        config.provider, config.model, config.source_lang, config.target_lang
    );
    info!(
        "max_concurrent: {}, rpm_limit: {}, tpm_limit: {}",
        config.max_concurrent, config.rpm_limit, config.tpm_limit
    );

    let files = match discover_files(&input)? {
        Some(files) => files,
        None => {
            eprintln!("❌ Input path not found: {}", input.display());
            return Ok(1);
        }
    };

    if files.is_empty() {
        println!("⚠️ No DOCX files found in directory: {}", input.display());
        return Ok(0);
    }

    // Fails fast on a missing API key, before any file is touched.
    let translator = DocxTranslator::new(&config)?;

    println!(
        "⚙️ Starting translation process for {} file(s)...",
        files.len()
    );

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );

    let mut completed = 0;
    let mut failed = 0;

    for file_path in &files {
        pb.set_message(format!("Translating: {}", file_path.display()));

        match translator.translate_file(file_path, &output_dir).await {
            Ok(out_path) => {
                completed += 1;
                pb.println(format!(
                    "✅ Completed: {} -> {}",
                    file_path.display(),
                    out_path.display()
                ));
            }
            Err(e) => {
                failed += 1;
                warn!("Failed to translate {}: {}", file_path.display(), e);
                pb.println(format!("❌ Failed: {} - {}", file_path.display(), e));
            }
        }
        pb.inc(1);
    }

    pb.finish_with_message("Done");

    let duration = start_time.elapsed();
    info!(
        "Batch finished: {} completed, {} failed in {:?}",
        completed, failed, duration
    );
    println!("\n🎉 All tasks finished!");
    println!("   Completed: {}", completed);
    println!("   Failed: {}", failed);
    println!("   Time: {:?}", duration);

    Ok(0)
}

/// Enumerate the input files.
///
/// Returns `None` when the path does not exist, `Some(vec)` otherwise; a
/// directory yields every `.docx` beneath it minus `~$` lock files.
fn discover_files(input: &Path) -> anyhow::Result<Option<Vec<PathBuf>>> {
    if input.is_dir() {
        let files = DocxTranslator::find_docx_files(input)?;
        Ok(Some(files))
    } else if input.is_file() {
        Ok(Some(vec![input.to_path_buf()]))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_missing_path() {
        let result = discover_files(Path::new("/nonexistent/path/file.docx")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_discover_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("doc.docx");
        std::fs::write(&file, b"x").unwrap();

        let result = discover_files(&file).unwrap().unwrap();
        assert_eq!(result, vec![file]);
    }

    #[test]
    fn test_discover_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = discover_files(dir.path()).unwrap().unwrap();
        assert!(result.is_empty());
    }
}
