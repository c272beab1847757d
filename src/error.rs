use thiserror::Error;

#[derive(Error, Debug)]
pub enum TallyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, TallyError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionErrorKind {
    /// The source is encrypted and could not be opened with the given key.
    Decryption,
    Unreadable,
    Unsupported,
}

impl std::fmt::Display for ExtractionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Decryption => "decryption",
            Self::Unreadable => "unreadable source",
            Self::Unsupported => "unsupported source",
        };
        f.write_str(label)
    }
}

/// Fatal to consolidation. Surfaced to the caller, never retried.
#[derive(Error, Debug)]
#[error("Extraction failed ({kind}): {detail}")]
pub struct ExtractionError {
    pub kind: ExtractionErrorKind,
    pub detail: String,
}

impl ExtractionError {
    pub fn new(kind: ExtractionErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn decryption(detail: impl Into<String>) -> Self {
        Self::new(ExtractionErrorKind::Decryption, detail)
    }

    pub fn unreadable(detail: impl Into<String>) -> Self {
        Self::new(ExtractionErrorKind::Unreadable, detail)
    }
}

/// A later page whose header did not match the canonical schema. Its rows
/// (header included) were appended to the pool unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaMismatch {
    pub page: usize,
    pub header: Vec<String>,
}

impl std::fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Page {} header [{}] differs from the first table; rows kept as-is",
            self.page + 1,
            self.header.join(", ")
        )
    }
}

#[derive(Error, Debug, Clone)]
#[error("Categorization failed: {0}")]
pub struct CategorizationError(pub String);

#[derive(Error, Debug, Clone)]
pub enum AdviceServiceError {
    #[error("No API key configured for the advice service")]
    MissingCredential,

    #[error("Advice service network error: {0}")]
    Network(String),

    #[error("Advice service API error: {0}")]
    Api(String),

    #[error("Advice service returned an unusable response: {0}")]
    Parse(String),
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Cache IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache CSV error: {0}")]
    Csv(#[from] csv::Error),
}
