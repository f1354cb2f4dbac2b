use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

use super::error::LoadError;
use super::spreadsheet;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Tabular file types the importer accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableFormat {
    /// `.csv` or `.txt`, handed to the parser as-is.
    Text,
    /// `.xlsx` or `.xls`, flattened to tab-delimited text first.
    Spreadsheet,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" | "txt" => Ok(TableFormat::Text),
            "xlsx" | "xls" => Ok(TableFormat::Spreadsheet),
            _ => Err(LoadError::UnsupportedType(ext)),
        }
    }
}

/// Text ready for the table parser.
#[derive(Debug, PartialEq, Eq)]
pub enum LoadedSource {
    Text(String),
    /// A spreadsheet with no data rows under its header.
    Empty,
}

pub fn load_source(path: &Path) -> Result<LoadedSource, LoadError> {
    let format = TableFormat::from_path(path)?;
    tracing::info!(path = %path.display(), ?format, "loading import source");

    match format {
        TableFormat::Text => read_text(path).map(LoadedSource::Text),
        TableFormat::Spreadsheet => Ok(match spreadsheet::sheet_to_text(path)? {
            Some(text) => LoadedSource::Text(text),
            None => LoadedSource::Empty,
        }),
    }
}

/// Reads a text file through a memory map. A leading UTF-8 BOM is dropped and
/// invalid sequences are replaced rather than rejected.
fn read_text(path: &Path) -> Result<String, LoadError> {
    let io_err = |source| LoadError::Io {
        path: path.display().to_string(),
        source,
    };

    let file = File::open(path).map_err(io_err)?;
    if file.metadata().map_err(io_err)?.len() == 0 {
        return Ok(String::new());
    }

    // Safety: the file is only read for the duration of this call and the
    // importer does not write to its own inputs.
    let mmap = unsafe { Mmap::map(&file).map_err(io_err)? };
    let bytes = mmap.strip_prefix(UTF8_BOM).unwrap_or(&mmap[..]);

    Ok(String::from_utf8_lossy(bytes).into_owned())
}
