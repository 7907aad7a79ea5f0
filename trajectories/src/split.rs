use anyhow::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Splits `0..len` into train and validation indices with a seeded shuffle. The first
/// `floor(len * train_fraction)` shuffled indices are for training.
pub fn partition(len: usize, train_fraction: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(0.0..=1.0).contains(&train_fraction) {
        bail!("train_fraction {} isn't in [0, 1]", train_fraction);
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..len).collect();
    indices.shuffle(&mut rng);
    let train_num = (len as f64 * train_fraction).floor() as usize;
    let val = indices.split_off(train_num);
    Ok((indices, val))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn test_disjoint_and_exhaustive() {
        for len in [0, 1, 7, 100] {
            let (train, val) = partition(len, 0.9, 123).unwrap();
            assert_eq!(train.len(), (len as f64 * 0.9) as usize);
            let train: BTreeSet<usize> = train.into_iter().collect();
            let val: BTreeSet<usize> = val.into_iter().collect();
            assert!(train.is_disjoint(&val));
            let all: BTreeSet<usize> = train.union(&val).cloned().collect();
            assert_eq!(all, (0..len).collect());
        }
    }

    #[test]
    fn test_reproducible() {
        assert_eq!(partition(50, 0.8, 4).unwrap(), partition(50, 0.8, 4).unwrap());
        assert_ne!(partition(50, 0.8, 4).unwrap(), partition(50, 0.8, 5).unwrap());
    }

    #[test]
    fn test_bad_fraction() {
        assert!(partition(10, 1.5, 0).is_err());
        assert!(partition(10, -0.1, 0).is_err());
        assert_eq!(partition(10, 1.0, 0).unwrap().1, Vec::<usize>::new());
    }
}
