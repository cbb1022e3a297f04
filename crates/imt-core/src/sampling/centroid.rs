use serde::{Deserialize, Serialize};

/// Incrementally updated mean of the vectors folded into it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningMean {
    centroid: Vec<f64>,
    count: u64,
}

impl RunningMean {
    pub fn new(centroid: Vec<f64>, count: u64) -> Self {
        Self { centroid, count }
    }

    pub fn centroid(&self) -> &[f64] {
        &self.centroid
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn dim(&self) -> usize {
        self.centroid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centroid.is_empty()
    }

    /// Fold a block of selected items, in order.
    ///
    /// The `rank`-th item (1-based) moves the centroid by
    /// `(x - centroid) / (count + rank)`, where `count` is the number of
    /// items folded before this block. An empty centroid takes the
    /// dimension of the first item.
    pub fn fold<'a, I>(&mut self, items: I)
    where
        I: IntoIterator<Item = &'a [f64]>,
    {
        let mut rank = 0u64;
        for x in items {
            rank += 1;
            if self.centroid.is_empty() {
                self.centroid = vec![0.0; x.len()];
            }
            let denom = (self.count + rank) as f64;
            for (c, &v) in self.centroid.iter_mut().zip(x) {
                *c += (v - *c) / denom;
            }
        }
        self.count += rank;
    }

    /// Cosine similarity to the centroid; 0 when either side has no norm.
    pub fn cosine(&self, v: &[f64]) -> f64 {
        cosine(&self.centroid, v)
    }
}

pub fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_fold_starts_from_the_item() {
        let mut m = RunningMean::default();
        m.fold([[2.0, 4.0].as_slice()]);
        assert_eq!(m.centroid(), &[2.0, 4.0]);
        assert_eq!(m.count(), 1);
    }

    #[test]
    fn fold_follows_the_update_law() {
        let mut m = RunningMean::new(vec![1.0, 0.0], 3);
        let items = [vec![5.0, 4.0], vec![0.0, 9.0]];
        m.fold(items.iter().map(Vec::as_slice));

        let mut expected = [1.0, 0.0];
        for (rank, x) in items.iter().enumerate() {
            for (c, v) in expected.iter_mut().zip(x) {
                *c += (v - *c) / (3 + rank + 1) as f64;
            }
        }
        assert_eq!(m.centroid(), &expected);
        assert_eq!(m.count(), 5);
    }

    #[test]
    fn cosine_of_empty_is_zero() {
        assert_eq!(RunningMean::default().cosine(&[1.0]), 0.0);
        assert!((cosine(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-12);
        assert!(cosine(&[1.0, 0.0], &[0.0, 3.0]).abs() < 1e-12);
    }
}
