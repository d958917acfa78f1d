use serde::Serialize;

use crate::data::model::Table;
use crate::error::Result;

/// Square Pearson correlation matrix. `cells[i][j]` correlates
/// `columns[i]` with `columns[j]`; `None` where undefined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub cells: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.cells.get(i)?.get(j).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Pearson's r over the pairs where both values are present.
///
/// `None` with fewer than two pairs or when either side is constant.
pub fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 || is_constant(pairs.iter().map(|p| p.0)) || is_constant(pairs.iter().map(|p| p.1)) {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    let denom = (sxx * syy).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    Some((sxy / denom).clamp(-1.0, 1.0))
}

// Exact comparison: a mean of identical floats can round away from them,
// which would leave a tiny spurious variance.
fn is_constant(mut values: impl Iterator<Item = f64>) -> bool {
    match values.next() {
        Some(first) => values.all(|v| v == first),
        None => true,
    }
}

/// Pairwise correlation of `columns`. Symmetric; the diagonal is exactly 1
/// for every column with nonzero variance.
pub fn correlation_matrix(table: &Table, columns: &[&str]) -> Result<CorrelationMatrix> {
    let series: Vec<Vec<Option<f64>>> = columns
        .iter()
        .map(|c| table.numeric(c))
        .collect::<Result<_>>()?;

    let n = series.len();
    let mut cells = vec![vec![None; n]; n];
    for i in 0..n {
        let present: Vec<f64> = series[i].iter().flatten().copied().collect();
        if present.len() >= 2 && !is_constant(present.into_iter()) {
            cells[i][i] = Some(1.0);
        }
        for j in (i + 1)..n {
            let r = pearson(&series[i], &series[j]);
            cells[i][j] = r;
            cells[j][i] = r;
        }
    }

    Ok(CorrelationMatrix {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        cells,
    })
}
