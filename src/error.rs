use thiserror::Error;

#[derive(Error, Debug)]
pub enum JunggoError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] ureq::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] refinery::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Extraction failed: {0}")]
    ExtractionError(String),

    #[error("Region lookup table error: {0}")]
    RegionMapError(String),

    #[error("Invalid query: {0}")]
    QueryError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl JunggoError {
    /// Get an actionable hint for how to resolve this error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            JunggoError::HttpError(_) => Some(
                "Check your internet connection, or lower the crawl rate in config.toml"
            ),
            JunggoError::DatabaseError(_) | JunggoError::MigrationError(_) => Some(
                "Try running `junggo doctor` to check database status"
            ),
            JunggoError::RegionMapError(_) => Some(
                "The region lookup table needs `dong` and `sigungu` columns (UTF-8 or CP949)"
            ),
            JunggoError::QueryError(_) => Some(
                "Models: iPhone 14, iPhone 14 Pro, iPhone 15, iPhone 15 Pro, iPhone 16, iPhone 16 Pro\nPlatforms: all, 번개장터, 중고나라, 당근마켓"
            ),
            JunggoError::ConfigError(_) | JunggoError::TomlError(_) => Some(
                "Check your configuration file, or run `junggo doctor` to see where it lives"
            ),
            JunggoError::CsvError(_) => Some(
                "Check that the file is a comma-separated file with a header row"
            ),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, JunggoError>;
