use super::columns::{ColumnMap, Field};
use super::item::ImportItem;
use super::newline::restore_newlines;
use super::parser::RawTable;

pub struct RowNormalizer<'a> {
    columns: &'a ColumnMap,
}

impl<'a> RowNormalizer<'a> {
    pub fn new(columns: &'a ColumnMap) -> Self {
        Self { columns }
    }

    /// Converts one data row into an item.
    ///
    /// Returns `None` when the title or reading text is blank or the unit is
    /// not a positive integer. Dropped rows leave no trace.
    pub fn normalize(&self, row: &[String]) -> Option<ImportItem> {
        let unit_index = self.cell(row, Field::Unit).and_then(parse_index)?;
        let article_index = self
            .cell(row, Field::Article)
            .and_then(parse_index)
            .unwrap_or(1);

        let title = self.cell(row, Field::Title).filter(|t| !t.trim().is_empty())?;
        let reading_text = self.cell(row, Field::Text).filter(|t| !t.trim().is_empty())?;

        Some(ImportItem {
            unit_index,
            article_index,
            title: restore_newlines(title),
            reading_text: restore_newlines(reading_text),
            translation: self.optional_text(row, Field::Translation),
            translation_en: self.optional_text(row, Field::TranslationEn),
            translation_vi: self.optional_text(row, Field::TranslationVi),
            translation_mn: self.optional_text(row, Field::TranslationMn),
            audio_url: self
                .cell(row, Field::AudioUrl)
                .filter(|u| !u.trim().is_empty())
                .map(str::to_string),
        })
    }

    /// `None` for an unmapped field or a row too short to reach the column.
    fn cell<'r>(&self, row: &'r [String], field: Field) -> Option<&'r str> {
        self.columns
            .get(field)
            .and_then(|i| row.get(i))
            .map(String::as_str)
    }

    fn optional_text(&self, row: &[String], field: Field) -> Option<String> {
        self.cell(row, field)
            .filter(|v| !v.trim().is_empty())
            .map(restore_newlines)
    }
}

/// Leading-integer parse: surrounding whitespace is ignored and trailing
/// non-digits are tolerated ("3", " 3 ", "3课" all give 3). Zero is rejected.
pub fn parse_index(value: &str) -> Option<u32> {
    let trimmed = value.trim();
    let digits_end = trimmed
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());

    trimmed[..digits_end].parse::<u32>().ok().filter(|n| *n > 0)
}

/// Result of running the column mapper and row normalizer over one table.
#[derive(Debug, Default, PartialEq)]
pub struct NormalizedTable {
    pub columns: ColumnMap,
    pub data_rows: usize,
    pub items: Vec<ImportItem>,
}

impl NormalizedTable {
    /// Rows that did not become items, blank or malformed alike.
    pub fn skipped(&self) -> usize {
        self.data_rows - self.items.len()
    }
}

/// Map the header once, then normalize every data row in order.
pub fn normalize_table(table: &RawTable) -> NormalizedTable {
    let Some(header) = table.header() else {
        return NormalizedTable::default();
    };

    let columns = ColumnMap::from_header(header);
    let missing = columns.missing_required();
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|f| f.name()).collect();
        tracing::warn!(missing = ?names, "header is missing required columns");
    }

    let normalizer = RowNormalizer::new(&columns);
    let items: Vec<ImportItem> = table
        .data_rows()
        .iter()
        .filter_map(|row| normalizer.normalize(row))
        .collect();

    tracing::debug!(
        rows = table.data_rows().len(),
        items = items.len(),
        "normalized data rows"
    );

    NormalizedTable {
        data_rows: table.data_rows().len(),
        items,
        columns,
    }
}
