//! Piecewise-linear interpolation along a monotone parameter.

/// Location of a target parameter between two samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    /// Index of the left sample
    pub left: usize,
    /// Blend weight of the right sample, in `[0, 1]`
    pub weight: f64,
}

impl Bracket {
    pub fn blend(&self, values: &[f64]) -> f64 {
        let (a, b) = (values[self.left], values[(self.left + 1).min(values.len() - 1)]);
        if self.weight == 0.0 {
            a
        } else if self.weight == 1.0 {
            b
        } else {
            (1.0 - self.weight) * a + self.weight * b
        }
    }
}

/// Bracket every target in the non-decreasing sequence `params`.
///
/// Targets must be sorted; targets outside `[params[0], params[n−1]]` get `None`.
/// The scan is monotone, hence linear in `params.len() + targets.len()`.
pub fn brackets(params: &[f64], targets: &[f64]) -> Vec<Option<Bracket>> {
    let n = params.len();
    let mut j = 0;
    targets
        .iter()
        .map(|&p| {
            if n == 0 || p < params[0] || p > params[n - 1] || p.is_nan() {
                return None;
            }
            if n == 1 {
                return Some(Bracket { left: 0, weight: 0.0 });
            }
            while j + 2 < n && params[j + 1] < p {
                j += 1;
            }
            let span = params[j + 1] - params[j];
            let weight = if p >= params[j + 1] {
                1.0
            } else if span <= 0.0 {
                0.0
            } else {
                ((p - params[j]) / span).clamp(0.0, 1.0)
            };
            Some(Bracket { left: j, weight })
        })
        .collect()
}

/// Linearly interpolate `values` (sampled at `params`) at every bracket.
pub fn interpolate(values: &[f64], brackets: &[Bracket]) -> Vec<f64> {
    brackets.iter().map(|b| b.blend(values)).collect()
}
