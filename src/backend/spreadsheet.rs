use calamine::{Data, Reader, open_workbook_auto};
use std::path::Path;

use super::error::LoadError;
use super::newline::escape_newlines;

/// Read the first worksheet and flatten it into tab-delimited text.
///
/// Returns `Ok(None)` when the sheet has a header but no data rows.
pub fn sheet_to_text(path: &Path) -> Result<Option<String>, LoadError> {
    let mut workbook = open_workbook_auto(path)?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(LoadError::NoWorksheet)??;

    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();

    tracing::debug!(path = %path.display(), rows = rows.len(), "read first worksheet");
    Ok(rows_to_text(rows))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.to_string(),
        _ => cell.to_string(),
    }
}

/// Header row plus one line per non-blank data row, each cell looked up by
/// header position with an empty default. Multi-line cells are escaped so
/// every record stays on one line.
pub fn rows_to_text(rows: Vec<Vec<String>>) -> Option<String> {
    let mut iter = rows.into_iter();
    let headers = iter.next()?;

    let data: Vec<Vec<String>> = iter
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .collect();

    if data.is_empty() {
        return None;
    }

    let mut lines = Vec::with_capacity(data.len() + 1);
    lines.push(
        headers
            .iter()
            .map(|h| flatten_cell(h))
            .collect::<Vec<_>>()
            .join("\t"),
    );

    for row in &data {
        let line = (0..headers.len())
            .map(|col| row.get(col).map(|c| flatten_cell(c)).unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\t");
        lines.push(line);
    }

    Some(lines.join("\n"))
}

fn flatten_cell(value: &str) -> String {
    escape_newlines(value).replace('\t', " ")
}
