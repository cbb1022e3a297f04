//! Scores computed from decoder attention.
//!
//! Rows are target positions, columns are encoded source positions.

const COVERAGE_FLOOR: f64 = 1e-10;

/// Fisher (excess) kurtosis of the values in `row`. A constant row has no
/// spread at all and gets the minimum, -3.
pub fn excess_kurtosis(row: &[f32]) -> f64 {
    if row.is_empty() {
        return -3.0;
    }
    let n = row.len() as f64;
    let mean = row.iter().map(|&x| f64::from(x)).sum::<f64>() / n;
    let (m2, m4) = row.iter().fold((0.0, 0.0), |(m2, m4), &x| {
        let d = f64::from(x) - mean;
        (m2 + d * d, m4 + d * d * d * d)
    });
    let (m2, m4) = (m2 / n, m4 / n);
    if m2 <= f64::EPSILON {
        return -3.0;
    }
    m4 / (m2 * m2) - 3.0
}

/// Negative mean kurtosis over target positions; higher is more diffuse.
pub fn distraction(attention: &[Vec<f32>]) -> f64 {
    if attention.is_empty() {
        return 0.0;
    }
    let total: f64 = attention.iter().map(|row| excess_kurtosis(row)).sum();
    -(total / attention.len() as f64)
}

/// Negated mean log of the attention mass each source position received,
/// clipped to `[1e-10, 1]`. 0 for a fully covered source, growing as
/// positions are neglected.
pub fn coverage_penalty(attention: &[Vec<f32>]) -> f64 {
    let width = attention.iter().map(Vec::len).max().unwrap_or(0);
    if width == 0 {
        return 0.0;
    }
    let mut mass = vec![0.0f64; width];
    for row in attention {
        for (m, &a) in mass.iter_mut().zip(row) {
            *m += f64::from(a);
        }
    }
    let logs: f64 = mass
        .iter()
        .map(|&m| m.clamp(COVERAGE_FLOOR, 1.0).ln())
        .sum();
    -(logs / width as f64)
}
