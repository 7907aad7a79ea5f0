use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const PAD: &str = "PAD";
pub const EOT: &str = "EOT";
pub const SOT: &str = "SOT";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenID(pub usize);

impl fmt::Display for TokenID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VocabError {
    /// A symbol was produced that the table doesn't know. Either the features were vectorized
    /// wrong, or the table on disk doesn't match the feature set.
    UnknownSymbol(String),
    UnknownId(TokenID),
    DuplicateId {
        id: TokenID,
        first: String,
        second: String,
    },
    MissingControl(&'static str),
}

impl fmt::Display for VocabError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSymbol(s) => write!(f, "symbol {s:?} isn't in the vocabulary"),
            Self::UnknownId(id) => write!(f, "token id {id} isn't in the vocabulary"),
            Self::DuplicateId { id, first, second } => {
                write!(f, "token id {id} is used by both {first:?} and {second:?}")
            }
            Self::MissingControl(s) => write!(f, "the vocabulary has no {s} token"),
        }
    }
}

impl std::error::Error for VocabError {}

/// A bijection between trajectory symbols and token ids. Immutable once built.
#[derive(Clone, Debug)]
pub struct Vocabulary {
    symbol_to_id: BTreeMap<String, TokenID>,
    id_to_symbol: BTreeMap<TokenID, String>,
    pad: TokenID,
    eot: TokenID,
}

impl Vocabulary {
    /// Fails if two symbols share an id, or if PAD or EOT are missing.
    pub fn new(symbol_to_id: BTreeMap<String, TokenID>) -> Result<Self, VocabError> {
        let mut id_to_symbol = BTreeMap::new();
        for (symbol, id) in &symbol_to_id {
            if let Some(first) = id_to_symbol.insert(*id, symbol.clone()) {
                return Err(VocabError::DuplicateId {
                    id: *id,
                    first,
                    second: symbol.clone(),
                });
            }
        }
        let pad = *symbol_to_id
            .get(PAD)
            .ok_or(VocabError::MissingControl(PAD))?;
        let eot = *symbol_to_id
            .get(EOT)
            .ok_or(VocabError::MissingControl(EOT))?;
        Ok(Self {
            symbol_to_id,
            id_to_symbol,
            pad,
            eot,
        })
    }

    /// Reads a JSON object mapping each symbol to its id.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs_err::read_to_string(path)?;
        let table: BTreeMap<String, TokenID> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing vocabulary {}", path.display()))?;
        let vocab =
            Self::new(table).with_context(|| format!("loading vocabulary {}", path.display()))?;
        info!("Loaded {} symbols from {}", vocab.size(), path.display());
        Ok(vocab)
    }

    /// Assigns dense ids to every distinct symbol observed, in sorted order, followed by any
    /// control tokens that weren't already among them.
    pub fn build<I: IntoIterator<Item = String>>(symbols: I) -> Result<Self, VocabError> {
        let mut ordered: Vec<String> = symbols
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        for control in [PAD, EOT, SOT] {
            if !ordered.iter().any(|s| s == control) {
                ordered.push(control.to_string());
            }
        }
        let table = ordered
            .into_iter()
            .enumerate()
            .map(|(idx, symbol)| (symbol, TokenID(idx)))
            .collect();
        Self::new(table)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.symbol_to_id)?;
        fs_err::write(path.as_ref(), json)?;
        info!(
            "Wrote {} symbols to {}",
            self.size(),
            path.as_ref().display()
        );
        Ok(())
    }

    pub fn lookup(&self, symbol: &str) -> Result<TokenID, VocabError> {
        self.symbol_to_id
            .get(symbol)
            .copied()
            .ok_or_else(|| VocabError::UnknownSymbol(symbol.to_string()))
    }

    pub fn encode<S: AsRef<str>>(&self, symbols: &[S]) -> Result<Vec<TokenID>, VocabError> {
        symbols.iter().map(|s| self.lookup(s.as_ref())).collect()
    }

    pub fn decode(&self, ids: &[TokenID]) -> Result<Vec<String>, VocabError> {
        ids.iter()
            .map(|id| {
                self.id_to_symbol
                    .get(id)
                    .cloned()
                    .ok_or(VocabError::UnknownId(*id))
            })
            .collect()
    }

    /// The number of symbols, which sizes a model's embedding table.
    pub fn size(&self) -> usize {
        self.symbol_to_id.len()
    }

    pub fn pad_id(&self) -> TokenID {
        self.pad
    }

    pub fn eot_id(&self) -> TokenID {
        self.eot
    }

    // Only the taxi tables carry a start token
    pub fn sot_id(&self) -> Result<TokenID, VocabError> {
        self.symbol_to_id
            .get(SOT)
            .copied()
            .ok_or(VocabError::MissingControl(SOT))
    }
}
