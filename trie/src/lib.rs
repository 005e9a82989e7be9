pub mod error;
mod trie;


pub use crate::error::{Result, TrieError};
pub use crate::trie::Trie;
