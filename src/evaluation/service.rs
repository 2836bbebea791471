//! Population Stability Index over reference-derived quantile bins.
//!
//! Bins come from percentile breakpoints of the reference at `i/K` for
//! `i = 0..=K`. Colliding breakpoints (constant stretches in the reference)
//! are merged so the cut points are strictly increasing, and the outermost
//! bins are open-ended so every score lands somewhere. A point mass at the
//! reference maximum keeps a bin of its own.

use super::domain::ReferenceDistribution;

/// Linear-interpolated quantile of an ascending slice; `q` in [0, 1].
pub(crate) fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = q.clamp(0.0, 1.0) * last as f64;
    let lo = rank.floor() as usize;
    let hi = (rank.ceil() as usize).min(last);
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Strictly increasing interior cut points; `cuts.len() + 1` bins.
#[derive(Clone, Debug, PartialEq)]
pub struct Binning {
    cuts: Vec<f64>,
}

impl Binning {
    /// Equal-mass bins of an ascending reference sample.
    ///
    /// An empty sample yields a single unbounded bin.
    pub(crate) fn from_sorted(sorted: &[f64], bins: usize) -> Self {
        let bins = bins.max(1);
        let raw: Vec<f64> = (0..=bins)
            .filter_map(|i| quantile(sorted, i as f64 / bins as f64))
            .collect();
        let Some(&max) = raw.last() else {
            return Self { cuts: Vec::new() };
        };

        let mut edges: Vec<f64> = Vec::with_capacity(raw.len());
        for &edge in &raw {
            if edges.last().map_or(true, |&prev| edge > prev) {
                edges.push(edge);
            }
        }

        let mut cuts = match edges.len() {
            1 => Vec::new(),
            n => edges[1..n - 1].to_vec(),
        };
        // Top breakpoints collided: the mass at the maximum gets `[max, +inf)`.
        // This also splits a constant reference at its value.
        if raw[raw.len() - 2] == max {
            cuts.push(max);
        }
        Self { cuts }
    }

    pub fn cuts(&self) -> &[f64] {
        &self.cuts
    }

    pub fn bin_count(&self) -> usize {
        self.cuts.len() + 1
    }

    /// Bins are `[cut_{i-1}, cut_i)`, first and last unbounded.
    pub fn bin_of(&self, value: f64) -> usize {
        self.cuts.partition_point(|&cut| cut <= value)
    }

    /// Fraction of `values` per bin; all zeros for an empty input.
    pub fn fractions<'a, I>(&self, values: I) -> Vec<f64>
    where
        I: IntoIterator<Item = &'a f64>,
    {
        let mut counts = vec![0usize; self.bin_count()];
        let mut total = 0usize;
        for &v in values {
            counts[self.bin_of(v)] += 1;
            total += 1;
        }
        if total == 0 {
            return vec![0.0; counts.len()];
        }
        counts
            .into_iter()
            .map(|c| c as f64 / total as f64)
            .collect()
    }
}

/// `sum (e - a) * ln(e / a)`, with exact zeros replaced by `floor`.
pub fn psi_from_fractions(expected: &[f64], actual: &[f64], floor: f64) -> f64 {
    expected
        .iter()
        .zip(actual)
        .map(|(&e, &a)| {
            let e = if e == 0.0 { floor } else { e };
            let a = if a == 0.0 { floor } else { a };
            (e - a) * (e / a).ln()
        })
        .sum()
}

/// Reference binned once, reused for every PSI query.
#[derive(Clone, Debug)]
pub struct ReferenceProfile {
    binning: Binning,
    expected: Vec<f64>,
    len: usize,
}

impl ReferenceProfile {
    pub fn new(reference: &ReferenceDistribution, bins: usize) -> Self {
        let sorted = reference.sorted();
        let binning = Binning::from_sorted(&sorted, bins);
        let expected = binning.fractions(&sorted);
        Self {
            binning,
            expected,
            len: sorted.len(),
        }
    }

    pub fn binning(&self) -> &Binning {
        &self.binning
    }

    pub fn expected(&self) -> &[f64] {
        &self.expected
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// PSI of `actual` against this reference; 0 for an empty sample.
    pub fn psi<'a, I>(&self, actual: I, floor: f64) -> f64
    where
        I: IntoIterator<Item = &'a f64>,
    {
        let actual = self.binning.fractions(actual);
        if actual.iter().all(|&a| a == 0.0) {
            return 0.0;
        }
        psi_from_fractions(&self.expected, &actual, floor)
    }
}

/// One-shot PSI between a reference and a sample of live scores.
pub fn population_stability_index(
    reference: &ReferenceDistribution,
    actual: &[f64],
    bins: usize,
    floor: f64,
) -> f64 {
    ReferenceProfile::new(reference, bins).psi(actual, floor)
}

/// Alert policy applied by the serving boundary. Slightly negative PSI
/// (an artefact of smoothing) counts as zero.
pub fn psi_alert(psi: f64, threshold: f64) -> bool {
    psi.max(0.0) > threshold
}
