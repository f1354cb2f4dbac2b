use anyhow::Result;
use clap::ValueEnum;
use std::io::Write;

use super::item::ImportItem;
use super::newline::escape_newlines;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
}

const CSV_HEADER: &[&str] = &[
    "unitIndex",
    "articleIndex",
    "title",
    "readingText",
    "translation",
    "translationEn",
    "translationVi",
    "translationMn",
    "audioUrl",
];

/// Write parsed items for review before they are submitted.
///
/// CSV cells carry line breaks as the newline placeholder, so the `parse`
/// command reads its own CSV output back into the same items.
pub fn write_items<W: Write>(items: &[ImportItem], format: ExportFormat, mut writer: W) -> Result<()> {
    match format {
        ExportFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, items)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        ExportFormat::Csv => {
            let mut csv = csv::Writer::from_writer(writer);
            csv.write_record(CSV_HEADER)?;
            for item in items {
                let unit = item.unit_index.to_string();
                let article = item.article_index.to_string();
                let opt = |v: &Option<String>| v.as_deref().map(escape_newlines).unwrap_or_default();
                csv.write_record([
                    unit,
                    article,
                    escape_newlines(&item.title),
                    escape_newlines(&item.reading_text),
                    opt(&item.translation),
                    opt(&item.translation_en),
                    opt(&item.translation_vi),
                    opt(&item.translation_mn),
                    opt(&item.audio_url),
                ])?;
            }
            csv.flush()?;
        }
    }
    Ok(())
}
