use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported file type {0:?}; expected .csv, .txt, .xlsx or .xls")]
    UnsupportedType(String),

    #[error("unable to open the spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("the workbook does not contain any worksheets")]
    NoWorksheet,
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend URL is not configured")]
    NotConfigured,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Function(String),

    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("upload rejected with status {0}")]
    UploadStatus(u16),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
