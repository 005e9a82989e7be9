use std::str::Utf8Error;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrieError {
    #[error("Invalid utf-8 in key: {0}")]
    InvalidEncoding(#[from] Utf8Error),
}

pub type Result<T> = std::result::Result<T, TrieError>;
