use anyhow::Result;
use serde::Serialize;

use crate::vocab::{TokenID, VocabError, Vocabulary};

/// A trajectory as handed out by a dataset, either still as symbols or already encoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sequence {
    Symbols(Vec<String>),
    Tokens(Vec<TokenID>),
}

impl Sequence {
    pub fn len(&self) -> usize {
        match self {
            Sequence::Symbols(x) => x.len(),
            Sequence::Tokens(x) => x.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn encode(&self, vocab: &Vocabulary) -> Result<Vec<TokenID>, VocabError> {
        match self {
            Sequence::Symbols(x) => vocab.encode(x),
            Sequence::Tokens(x) => Ok(x.clone()),
        }
    }
}

/// What the model layer consumes. `tokens` and `mask` have the same shape: one row per
/// trajectory, as wide as the longest one.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Batch<M> {
    pub tokens: Vec<Vec<TokenID>>,
    /// 1 for real positions, 0 for padding
    pub mask: Vec<Vec<u8>>,
    pub metadata: Vec<M>,
}

impl<M> Batch<M> {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn width(&self) -> usize {
        self.tokens.first().map(|row| row.len()).unwrap_or(0)
    }

    pub fn true_lengths(&self) -> Vec<usize> {
        self.mask
            .iter()
            .map(|row| row.iter().filter(|x| **x == 1).count())
            .collect()
    }
}

/// Pads every sequence to the longest one in `items`, keeping the input order. Symbol sequences
/// are encoded first.
pub fn collate<M: Clone>(items: &[(M, Sequence)], vocab: &Vocabulary) -> Result<Batch<M>> {
    if items.is_empty() {
        bail!("Can't collate an empty list of trajectories");
    }
    let max_len = items.iter().map(|(_, seq)| seq.len()).max().unwrap_or(0);
    let pad = vocab.pad_id();

    let mut tokens = Vec::with_capacity(items.len());
    let mut mask = Vec::with_capacity(items.len());
    let mut metadata = Vec::with_capacity(items.len());
    for (meta, seq) in items {
        let mut row = seq.encode(vocab)?;
        let true_len = row.len();
        row.resize(max_len, pad);

        let mut mask_row = vec![1; true_len];
        mask_row.resize(max_len, 0);

        tokens.push(row);
        mask.push(mask_row);
        metadata.push(meta.clone());
    }
    Ok(Batch {
        tokens,
        mask,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn vocab() -> Vocabulary {
        let table: BTreeMap<String, TokenID> = [("A", 0), ("B", 1), ("PAD", 2), ("EOT", 3)]
            .into_iter()
            .map(|(s, id)| (s.to_string(), TokenID(id)))
            .collect();
        Vocabulary::new(table).unwrap()
    }

    fn tokens(ids: &[usize]) -> Sequence {
        Sequence::Tokens(ids.iter().map(|x| TokenID(*x)).collect())
    }

    #[test]
    fn test_pad_and_mask() {
        let items = vec![("first", tokens(&[0, 1, 3])), ("second", tokens(&[0, 0, 1, 1, 3]))];
        let batch = collate(&items, &vocab()).unwrap();
        assert_eq!(batch.width(), 5);
        assert_eq!(batch.mask, vec![vec![1, 1, 1, 0, 0], vec![1, 1, 1, 1, 1]]);
        assert_eq!(
            batch.tokens[0],
            vec![TokenID(0), TokenID(1), TokenID(3), TokenID(2), TokenID(2)]
        );
        assert_eq!(batch.metadata, vec!["first", "second"]);
        assert_eq!(batch.true_lengths(), vec![3, 5]);
    }

    #[test]
    fn test_order_preserved_and_symbols_encoded() {
        let items = vec![
            (0, tokens(&[0, 1, 1, 1, 3])),
            (
                1,
                Sequence::Symbols(vec!["B".to_string(), "EOT".to_string()]),
            ),
            (2, tokens(&[3])),
        ];
        let batch = collate(&items, &vocab()).unwrap();
        assert_eq!(batch.metadata, vec![0, 1, 2]);
        assert_eq!(
            batch.tokens[1],
            vec![TokenID(1), TokenID(3), TokenID(2), TokenID(2), TokenID(2)]
        );
        for (row, true_len) in batch.tokens.iter().zip(batch.true_lengths()) {
            assert_eq!(row.len(), batch.width());
            assert!(row[true_len..].iter().all(|t| *t == TokenID(2)));
        }
        for (mask_row, token_row) in batch.mask.iter().zip(&batch.tokens) {
            assert_eq!(mask_row.len(), token_row.len());
        }
    }

    #[test]
    fn test_errors() {
        let empty: Vec<((), Sequence)> = Vec::new();
        assert!(collate(&empty, &vocab()).is_err());

        let items = vec![((), Sequence::Symbols(vec!["C".to_string()]))];
        let err = collate(&items, &vocab()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<VocabError>(),
            Some(&VocabError::UnknownSymbol("C".to_string()))
        );
    }
}
