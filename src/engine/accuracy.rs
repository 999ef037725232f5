use crate::math::matrix::Matrix;

/// Which top-k accuracies `evaluate` reports.
///
/// A single k reports one accuracy; two or more switch on multi-accuracy
/// reporting (e.g. top-1 and top-5). Every accuracy is keyed by its own k,
/// so a single-mode `TopK::from(5)` reports `acc5` / `Acc@5`, never `acc1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopK {
    ks: Vec<usize>,
}

impl TopK {
    pub fn new(ks: Vec<usize>) -> TopK {
        let ks: Vec<usize> = ks.into_iter().map(|k| k.max(1)).collect();
        if ks.is_empty() {
            return TopK { ks: vec![1] };
        }
        TopK { ks }
    }

    pub fn ks(&self) -> &[usize] {
        &self.ks
    }

    pub fn is_multi(&self) -> bool {
        self.ks.len() > 1
    }

    /// Metric name for a given k, e.g. `acc5`.
    pub fn metric_name(k: usize) -> String {
        format!("acc{}", k)
    }
}

impl From<usize> for TopK {
    fn from(k: usize) -> TopK {
        TopK::new(vec![k])
    }
}

impl From<(usize, usize)> for TopK {
    fn from((a, b): (usize, usize)) -> TopK {
        TopK::new(vec![a, b])
    }
}

impl From<&[usize]> for TopK {
    fn from(ks: &[usize]) -> TopK {
        TopK::new(ks.to_vec())
    }
}

impl From<Vec<usize>> for TopK {
    fn from(ks: Vec<usize>) -> TopK {
        TopK::new(ks)
    }
}

/// Percentage of rows whose target class is among the `k` highest scores,
/// one value per requested `k`. A `k` wider than the class count counts
/// every row as correct.
pub fn accuracy(outputs: &Matrix, classes: &[usize], ks: &[usize]) -> Vec<f64> {
    assert_eq!(outputs.rows, classes.len(), "one class per output row");
    if outputs.rows == 0 {
        return vec![0.0; ks.len()];
    }
    let max_k = ks.iter().copied().max().unwrap_or(1).min(outputs.cols);
    let ranked = outputs.top_k_rows(max_k);
    ks.iter()
        .map(|&k| {
            let correct = ranked
                .iter()
                .zip(classes)
                .filter(|(top, c)| top.iter().take(k).any(|i| i == *c))
                .count();
            correct as f64 * 100.0 / outputs.rows as f64
        })
        .collect()
}
