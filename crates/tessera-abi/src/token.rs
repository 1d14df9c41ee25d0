//! Token ids exchanged between the engine and a backend.

use serde::{Deserialize, Serialize};

/// A vocabulary id as produced by the backend tokenizer.
/// Plugins report failures through return codes, so a `Token` is never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(pub i32);

impl Token {
    #[inline]
    pub const fn id(self) -> i32 {
        self.0
    }
}

impl From<i32> for Token {
    #[inline]
    fn from(value: i32) -> Self {
        Token(value)
    }
}

/// Flatten a token slice into raw ids for a C call.
pub fn to_ids(tokens: &[Token]) -> Vec<i32> {
    tokens.iter().map(|t| t.0).collect()
}
