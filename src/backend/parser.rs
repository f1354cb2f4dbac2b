use serde::Serialize;

/// Field separator, chosen once for a whole block of text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Delimiter {
    Tab,
    Comma,
}

impl Delimiter {
    /// Tab wins if any line contains one; otherwise the text is CSV.
    pub fn detect<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        if lines.into_iter().any(|line| line.contains('\t')) {
            Delimiter::Tab
        } else {
            Delimiter::Comma
        }
    }
}

/// Rows of string cells as they were pasted or read, header first.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RawTable {
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(|r| r.as_slice())
    }

    /// Everything after the header row.
    pub fn data_rows(&self) -> &[Vec<String>] {
        if self.rows.is_empty() {
            &[]
        } else {
            &self.rows[1..]
        }
    }
}

pub struct TableParser;

impl TableParser {
    /// Parses pasted or loaded text into a table.
    ///
    /// Never fails: anything short of a header plus one data row comes back
    /// as an empty table.
    pub fn parse(text: &str) -> RawTable {
        let lines: Vec<&str> = text
            .split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .filter(|l| !l.trim().is_empty())
            .collect();

        if lines.len() < 2 {
            tracing::debug!(lines = lines.len(), "not enough lines for a header and a data row");
            return RawTable::default();
        }

        let delimiter = Delimiter::detect(lines.iter().copied());
        tracing::debug!(?delimiter, lines = lines.len(), "parsing table");

        let rows = lines
            .into_iter()
            .map(|line| Self::split_line(line, delimiter))
            .collect();

        RawTable { rows }
    }

    pub fn split_line(line: &str, delimiter: Delimiter) -> Vec<String> {
        match delimiter {
            Delimiter::Tab => line.split('\t').map(str::to_string).collect(),
            Delimiter::Comma => Self::split_csv_line(line),
        }
    }

    /// Quote-aware comma split. Fields are trimmed; `""` inside quotes is a
    /// literal quote.
    fn split_csv_line(line: &str) -> Vec<String> {
        let mut fields = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut chars = line.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '"' if in_quotes && chars.peek() == Some(&'"') => {
                    chars.next();
                    current.push('"');
                }
                '"' => {
                    in_quotes = !in_quotes;
                }
                ',' if !in_quotes => {
                    fields.push(current.trim().to_string());
                    current.clear();
                }
                _ => {
                    current.push(c);
                }
            }
        }
        fields.push(current.trim().to_string());
        fields
    }
}
