//! DOCX file processor: text extraction, chunking, and reassembly

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::{debug, info, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::core::client::ProviderClient;
use crate::core::config::TranslatorConfig;
use crate::core::dispatcher::ChunkDispatcher;
use crate::core::errors::{Result, TranslationError};
use crate::core::limiter::RateLimiter;
use crate::core::models::Chunk;

/// Archive entry holding the document body
const DOCUMENT_ENTRY: &str = "word/document.xml";

fn paragraph_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<w:p(?:>|\s[^>]*>).*?</w:p>").expect("valid regex"))
}

fn run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>").expect("valid regex"))
}

/// Byte range of one `<w:t>` run's inner text within `document.xml`
#[derive(Debug, Clone, Copy)]
struct RunSpan {
    start: usize,
    end: usize,
}

/// One paragraph's text runs and their concatenated, unescaped text
#[derive(Debug, Clone)]
struct Paragraph {
    runs: Vec<RunSpan>,
    text: String,
}

/// A chunk plus the range of paragraphs it was packed from
#[derive(Debug, Clone)]
struct ChunkSpan {
    chunk: Chunk,
    first_paragraph: usize,
    paragraph_count: usize,
}

/// Translates DOCX files chunk by chunk through the dispatch engine
#[derive(Debug, Clone)]
pub struct DocxTranslator {
    dispatcher: ChunkDispatcher,
    max_chunk_size: usize,
}

impl DocxTranslator {
    /// Build the full per-run pipeline: provider session, shared rate
    /// limiter, and bounded dispatcher.
    pub fn new(config: &TranslatorConfig) -> Result<Self> {
        let client = Arc::new(ProviderClient::new(config)?);
        let limiter = Arc::new(RateLimiter::new(config.rpm_limit, config.tpm_limit));
        let dispatcher = ChunkDispatcher::new(client, limiter, config.max_concurrent);

        Ok(Self {
            dispatcher,
            max_chunk_size: config.max_chunk_size,
        })
    }

    /// Find DOCX files under a directory, skipping `~$` lock files
    pub fn find_docx_files(dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(TranslationError::FileError {
                path: dir.display().to_string(),
                message: "Not a directory".to_string(),
            });
        }

        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && is_docx_file(path) {
                files.push(path.to_path_buf());
            }
        }
        files.sort();

        Ok(files)
    }

    /// Translate one DOCX file and write the result to `output_dir`.
    ///
    /// Chunk-level provider errors are collected, not propagated: when any
    /// chunk fails the file is reported failed with
    /// [`TranslationError::ChunkFailures`] after every sibling chunk has
    /// resolved, so the batch driver can move on to the next file.
    pub async fn translate_file(&self, input: &Path, output_dir: &Path) -> Result<PathBuf> {
        debug!("Translating: {}", input.display());

        let xml = read_document_xml(input)?;
        let paragraphs = extract_paragraphs(&xml);
        let spans = pack_chunks(&paragraphs, self.max_chunk_size);
        let total = spans.len();
        info!(
            "{}: {} paragraphs packed into {} chunks",
            input.display(),
            paragraphs.len(),
            total
        );

        let chunks: Vec<Chunk> = spans.iter().map(|s| s.chunk.clone()).collect();
        let results = self.dispatcher.dispatch(chunks).await;

        let mut translations: HashMap<usize, String> = HashMap::new();
        let mut failed = 0;
        for (id, result) in results {
            match result {
                Ok(text) => {
                    translations.insert(id, text);
                }
                Err(e) => {
                    failed += 1;
                    warn!("Chunk {} of {} failed: {}", id, input.display(), e);
                }
            }
        }

        if failed > 0 {
            info!(
                "{}: {} of {} chunks translated before failure",
                input.display(),
                translations.len(),
                total
            );
            return Err(TranslationError::ChunkFailures { failed, total });
        }

        let translated_xml = reassemble(&xml, &paragraphs, &spans, &translations);
        let out_path = output_path(input, output_dir);
        write_docx(input, &out_path, &translated_xml)?;

        info!("Translated: {} -> {}", input.display(), out_path.display());
        Ok(out_path)
    }
}

fn is_docx_file(path: &Path) -> bool {
    let is_ext = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase() == "docx")
        .unwrap_or(false);
    let is_lock = path
        .file_name()
        .map(|n| n.to_string_lossy().starts_with("~$"))
        .unwrap_or(false);
    is_ext && !is_lock
}

fn output_path(input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    output_dir.join(format!("{}_translated.docx", stem))
}

fn read_document_xml(input: &Path) -> Result<String> {
    let file = std::fs::File::open(input).map_err(|e| TranslationError::FileError {
        path: input.display().to_string(),
        message: e.to_string(),
    })?;
    let mut archive = ZipArchive::new(file)?;
    let mut entry = archive
        .by_name(DOCUMENT_ENTRY)
        .map_err(|_| TranslationError::FileError {
            path: input.display().to_string(),
            message: format!("missing {} entry, not a DOCX file?", DOCUMENT_ENTRY),
        })?;

    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    Ok(xml)
}

/// Extract paragraphs with at least one non-empty text run, in document order
fn extract_paragraphs(xml: &str) -> Vec<Paragraph> {
    let mut paragraphs = Vec::new();

    for para in paragraph_re().find_iter(xml) {
        let base = para.start();
        let mut runs = Vec::new();
        let mut text = String::new();

        for caps in run_re().captures_iter(para.as_str()) {
            let inner = caps.get(1).expect("capture group 1");
            runs.push(RunSpan {
                start: base + inner.start(),
                end: base + inner.end(),
            });
            text.push_str(&unescape_xml(inner.as_str()));
        }

        if !runs.is_empty() && !text.trim().is_empty() {
            paragraphs.push(Paragraph { runs, text });
        }
    }

    paragraphs
}

/// Pack consecutive paragraphs into chunks of at most `max_chunk_size`
/// characters, joined by blank lines. A single paragraph over the cap
/// becomes its own oversized chunk. Chunk ids are positional.
fn pack_chunks(paragraphs: &[Paragraph], max_chunk_size: usize) -> Vec<ChunkSpan> {
    let mut spans: Vec<ChunkSpan> = Vec::new();
    let mut current_text = String::new();
    let mut current_first = 0;
    let mut current_count = 0;

    let flush = |text: &mut String, first: usize, count: usize, spans: &mut Vec<ChunkSpan>| {
        if count > 0 {
            spans.push(ChunkSpan {
                chunk: Chunk::new(spans.len(), std::mem::take(text)),
                first_paragraph: first,
                paragraph_count: count,
            });
        }
    };

    for (idx, para) in paragraphs.iter().enumerate() {
        let added = if current_count == 0 {
            para.text.len()
        } else {
            current_text.len() + 2 + para.text.len()
        };

        if current_count > 0 && added > max_chunk_size {
            flush(&mut current_text, current_first, current_count, &mut spans);
            current_count = 0;
        }

        if current_count == 0 {
            current_first = idx;
            current_text = para.text.clone();
            current_count = 1;
        } else {
            current_text.push_str("\n\n");
            current_text.push_str(&para.text);
            current_count += 1;
        }

        // An oversized paragraph travels alone.
        if current_count == 1 && current_text.len() > max_chunk_size {
            flush(&mut current_text, current_first, current_count, &mut spans);
            current_count = 0;
        }
    }
    flush(&mut current_text, current_first, current_count, &mut spans);

    spans
}

/// Splice translated chunk texts back over the original runs.
///
/// When a chunk's translation splits into as many blank-line-separated
/// parts as it had paragraphs, parts map 1:1; otherwise the whole
/// translation lands in the chunk's first paragraph and the rest are
/// blanked. Within a paragraph the first run receives the text and the
/// remaining runs are emptied, keeping the document structure intact.
fn reassemble(
    xml: &str,
    paragraphs: &[Paragraph],
    spans: &[ChunkSpan],
    translations: &HashMap<usize, String>,
) -> String {
    // (run span, replacement) in ascending document order
    let mut replacements: Vec<(RunSpan, String)> = Vec::new();

    for span in spans {
        let Some(translated) = translations.get(&span.chunk.id) else {
            continue;
        };
        let paras = &paragraphs[span.first_paragraph..span.first_paragraph + span.paragraph_count];

        let parts: Vec<&str> = translated.split("\n\n").collect();
        let per_paragraph: Vec<String> = if parts.len() == paras.len() {
            parts.iter().map(|p| p.to_string()).collect()
        } else {
            let mut v = vec![String::new(); paras.len()];
            v[0] = translated.clone();
            v
        };

        for (para, text) in paras.iter().zip(per_paragraph) {
            for (i, run) in para.runs.iter().enumerate() {
                let replacement = if i == 0 { escape_xml(&text) } else { String::new() };
                replacements.push((*run, replacement));
            }
        }
    }

    let mut result = String::with_capacity(xml.len());
    let mut cursor = 0;
    for (run, replacement) in replacements {
        result.push_str(&xml[cursor..run.start]);
        result.push_str(&replacement);
        cursor = run.end;
    }
    result.push_str(&xml[cursor..]);
    result
}

fn write_docx(input: &Path, output: &Path, document_xml: &str) -> Result<()> {
    if let Some(parent) = output.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let in_file = std::fs::File::open(input)?;
    let mut archive = ZipArchive::new(in_file)?;

    let out_file = std::fs::File::create(output).map_err(|e| TranslationError::FileError {
        path: output.display().to_string(),
        message: e.to_string(),
    })?;
    let mut writer = ZipWriter::new(out_file);

    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        if entry.name() == DOCUMENT_ENTRY {
            let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
            writer.start_file(DOCUMENT_ENTRY, options)?;
            writer.write_all(document_xml.as_bytes())?;
        } else {
            writer.raw_copy_file(entry)?;
        }
    }
    writer.finish()?;

    Ok(())
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
