use std::error::Error;
use std::fmt;

/// Custom Error and Result types to unify errors from all sources.
pub type RankingResult<T> = Result<T, RankingError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankingError {
    Http(String),
    Parse(String),
    Config(String),
    Query(String),
    Server(String),
}

impl fmt::Display for RankingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RankingError::Http(s) => write!(f, "HTTP Error: {}", s),
            RankingError::Parse(s) => write!(f, "Parse Error: {}", s),
            RankingError::Config(s) => write!(f, "Configuration Error: {}", s),
            RankingError::Query(s) => write!(f, "Query Error: {}", s),
            RankingError::Server(s) => write!(f, "Server Error: {}", s),
        }
    }
}

impl Error for RankingError {}

impl From<reqwest::Error> for RankingError {
    fn from(error: reqwest::Error) -> Self {
        RankingError::Http(error.to_string())
    }
}

impl From<figment::Error> for RankingError {
    fn from(error: figment::Error) -> Self {
        RankingError::Config(error.to_string())
    }
}

impl From<std::io::Error> for RankingError {
    fn from(error: std::io::Error) -> Self {
        RankingError::Server(error.to_string())
    }
}
