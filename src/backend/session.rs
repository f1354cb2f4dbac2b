//! One import run: read a table, parse it, attach audio, submit.
//!
//! Nothing here returns an error to the caller. Every outcome is reduced to
//! data plus a status line the CLI can print as-is.

use std::path::{Path, PathBuf};

use super::audio::{self, AudioFileEntry, AudioUploader, UploadStatus};
use super::item::ImportItem;
use super::loader::{self, LoadedSource};
use super::normalizer::{NormalizedTable, normalize_table};
use super::parser::TableParser;
use super::remote::{ContentStore, ImportReport};

pub fn parse_text(text: &str) -> NormalizedTable {
    normalize_table(&TableParser::parse(text))
}

#[derive(Debug, PartialEq)]
pub enum SourceStatus {
    Parsed(NormalizedTable),
    Empty,
    Unreadable(String),
}

impl SourceStatus {
    pub fn message(&self) -> String {
        match self {
            SourceStatus::Parsed(parsed) => {
                let mut msg = format!("Parsed {} items", parsed.items.len());
                if parsed.skipped() > 0 {
                    msg.push_str(&format!(" ({} rows skipped)", parsed.skipped()));
                }
                let missing = parsed.columns.missing_required();
                if parsed.data_rows > 0 && !missing.is_empty() {
                    let names: Vec<&str> = missing.iter().map(|f| f.name()).collect();
                    msg.push_str(&format!("; no column found for {}", names.join(", ")));
                }
                msg
            }
            SourceStatus::Empty => "File is empty".to_string(),
            SourceStatus::Unreadable(e) => format!("Could not read file: {e}"),
        }
    }

    pub fn into_items(self) -> Vec<ImportItem> {
        match self {
            SourceStatus::Parsed(parsed) => parsed.items,
            _ => Vec::new(),
        }
    }
}

pub fn read_import_file(path: &Path) -> SourceStatus {
    match loader::load_source(path) {
        Ok(LoadedSource::Text(text)) => SourceStatus::Parsed(parse_text(&text)),
        Ok(LoadedSource::Empty) => SourceStatus::Empty,
        Err(e) => {
            tracing::warn!(path = %path.display(), "failed to load import source: {e}");
            SourceStatus::Unreadable(e.to_string())
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct AudioSummary {
    pub uploaded: usize,
    pub failed: usize,
    pub excluded: Vec<PathBuf>,
    pub matched: usize,
    pub entries: Vec<AudioFileEntry>,
}

impl AudioSummary {
    pub fn message(&self) -> String {
        let mut msg = format!(
            "Uploaded {} audio files, {} failed; {} articles matched",
            self.uploaded, self.failed, self.matched
        );
        if !self.excluded.is_empty() {
            msg.push_str(&format!(
                "; {} files ignored (no unit number in name)",
                self.excluded.len()
            ));
        }
        msg
    }
}

/// Upload the given audio files in order and backfill matching items.
pub fn upload_and_attach<U: AudioUploader>(
    items: &mut [ImportItem],
    audio_files: &[PathBuf],
    uploader: &U,
    on_update: impl FnMut(&AudioFileEntry),
) -> AudioSummary {
    let (pending, excluded) = audio::pending_entries(audio_files);
    let entries = audio::upload_all(&pending, uploader, on_update);
    let matched = audio::attach_audio_urls(items, &entries);

    let uploaded = entries
        .iter()
        .filter(|e| e.status == UploadStatus::Done)
        .count();

    AudioSummary {
        uploaded,
        failed: entries.len() - uploaded,
        excluded,
        matched,
        entries,
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum SubmitStatus {
    Nothing,
    Done(ImportReport),
    Failed(String),
}

impl SubmitStatus {
    pub fn message(&self) -> String {
        match self {
            SubmitStatus::Nothing => "Nothing to import".to_string(),
            SubmitStatus::Done(report) => {
                let mut msg = format!(
                    "Import finished: {} created, {} updated, {} failed",
                    report.created, report.updated, report.failed
                );
                for e in &report.errors {
                    msg.push('\n');
                    msg.push_str(e);
                }
                msg
            }
            SubmitStatus::Failed(e) => format!("Import failed: {e}"),
        }
    }
}

/// Submit once; a failure is reported, not retried.
pub fn submit<S: ContentStore>(store: &S, course_id: &str, items: &[ImportItem]) -> SubmitStatus {
    if items.is_empty() {
        return SubmitStatus::Nothing;
    }
    match store.bulk_import(course_id, items) {
        Ok(report) => SubmitStatus::Done(report),
        Err(e) => {
            tracing::error!(course_id, "bulk import failed: {e}");
            SubmitStatus::Failed(e.to_string())
        }
    }
}
