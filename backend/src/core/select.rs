//! Small selection helpers shared by the markets and invention
//!
//! Ties always resolve to the lowest position so that a run depends only on
//! its seed.

use std::cmp::Ordering;

/// Position of the first maximum, `None` for an empty slice
pub fn argmax(values: &[f64]) -> Option<usize> {
    first_by(values, |candidate, best| candidate > best)
}

/// Position of the first minimum, `None` for an empty slice
pub fn argmin(values: &[f64]) -> Option<usize> {
    first_by(values, |candidate, best| candidate < best)
}

fn first_by(values: &[f64], better: impl Fn(f64, f64) -> bool) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some(b) if !better(v, values[b]) => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Element of `items` with the highest key, first one on ties
pub fn max_by_key_first<T: Copy>(items: &[T], key: impl Fn(T) -> f64) -> Option<T> {
    let mut best: Option<(T, f64)> = None;
    for &item in items {
        let k = key(item);
        if best.map_or(true, |(_, bk)| k.partial_cmp(&bk) == Some(Ordering::Greater)) {
            best = Some((item, k));
        }
    }
    best.map(|(item, _)| item)
}

/// Two distinct mutable elements of one slice
///
/// # Panics
/// Panics if `i == j` or either index is out of bounds
pub fn pair_mut<T>(items: &mut [T], i: usize, j: usize) -> (&mut T, &mut T) {
    assert_ne!(i, j, "pair_mut needs two distinct indices");
    if i < j {
        let (low, high) = items.split_at_mut(j);
        (&mut low[i], &mut high[0])
    } else {
        let (low, high) = items.split_at_mut(i);
        (&mut high[0], &mut low[j])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ties_pick_first() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0]), Some(1));
        assert_eq!(argmin(&[2.0, 1.0, 1.0]), Some(1));
        assert_eq!(argmax(&[]), None);
        assert_eq!(max_by_key_first(&[4usize, 7, 9], |x| (x % 2) as f64), Some(7));
    }

    #[test]
    fn test_pair_mut_either_order() {
        let mut v = vec![1, 2, 3];
        {
            let (a, b) = pair_mut(&mut v, 2, 0);
            std::mem::swap(a, b);
        }
        assert_eq!(v, vec![3, 2, 1]);
    }
}
