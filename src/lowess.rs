//! LOWESS smoothing (locally weighted scatterplot smoothing).
//!
//! Fits a weighted straight line around every sample, with tricube weights over the
//! `bandwidth * n` nearest neighbours, and optional bisquare robustness passes that
//! down-weight samples with large residuals. Used to build the reference elevation
//! curve that residual-based outlier detection compares against.
//!
//! For long inputs the `delta` shortcut skips fitting at samples closer than `delta`
//! to the last fitted one and linearly interpolates instead, which keeps the cost
//! close to linear for dense GPS recordings.
//!
//! Reference: Cleveland, W. S. (1979). Robust Locally Weighted Regression and
//! Smoothing Scatterplots. JASA 74(368), 829-836.

/// Robustness passes stop once the median absolute residual drops below this
/// fraction of the mean absolute response.
const RESIDUAL_TOLERANCE: f64 = 1e-7;

/// Smoother parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lowess {
    /// Fraction of the samples used for each local fit, in (0, 1].
    pub bandwidth: f64,
    /// Number of bisquare reweighting passes after the initial fit.
    pub robustness_iterations: u32,
    /// Fit only at samples at least `delta` apart on the x axis; 0 fits everywhere.
    pub delta: f64,
}

impl Default for Lowess {
    fn default() -> Self {
        Self {
            bandwidth: 0.2,
            robustness_iterations: 2,
            delta: 0.0,
        }
    }
}

impl Lowess {
    /// Smooth `ys` as a function of `xs`.
    ///
    /// `xs` must be sorted ascending and have the same length as `ys`; returns
    /// `None` otherwise, or if any input is not finite.
    ///
    /// # Example
    /// ```
    /// use track_editor::lowess::Lowess;
    ///
    /// let xs: Vec<f64> = (0..20).map(|i| i as f64).collect();
    /// let ys: Vec<f64> = xs.iter().map(|x| 3.0 * x + 1.0).collect();
    /// let fitted = Lowess::default().smooth(&xs, &ys).unwrap();
    /// assert!((fitted[10] - 31.0).abs() < 1e-9);
    /// ```
    pub fn smooth(&self, xs: &[f64], ys: &[f64]) -> Option<Vec<f64>> {
        if xs.len() != ys.len() {
            return None;
        }
        if xs.iter().chain(ys).any(|v| !v.is_finite()) {
            return None;
        }
        if xs.windows(2).any(|w| w[1] < w[0]) {
            return None;
        }

        let n = xs.len();
        if n < 3 {
            return Some(ys.to_vec());
        }

        let span = ((self.bandwidth * n as f64).ceil() as usize).clamp(2, n);
        let mut robustness = vec![1.0; n];
        let mut fitted = self.fit_pass(xs, ys, span, &robustness);

        let mean_abs_y = ys.iter().map(|y| y.abs()).sum::<f64>() / n as f64;
        for _ in 0..self.robustness_iterations {
            let residuals: Vec<f64> = ys.iter().zip(&fitted).map(|(y, f)| y - f).collect();
            let scale = median(residuals.iter().map(|r| r.abs()).collect());
            if scale <= RESIDUAL_TOLERANCE * mean_abs_y {
                break;
            }
            for (w, r) in robustness.iter_mut().zip(&residuals) {
                *w = bisquare(r / (6.0 * scale));
            }
            fitted = self.fit_pass(xs, ys, span, &robustness);
        }

        Some(fitted)
    }

    /// One full pass of local fits with the given robustness weights.
    fn fit_pass(&self, xs: &[f64], ys: &[f64], span: usize, robustness: &[f64]) -> Vec<f64> {
        let n = xs.len();
        let mut fitted = vec![0.0; n];
        let mut left = 0;
        let mut right = span - 1;
        let mut last_fit: Option<usize> = None;
        let mut i = 0;

        loop {
            // Slide the window so it holds the span nearest neighbours of xs[i]
            while right + 1 < n && xs[i] - xs[left] > xs[right + 1] - xs[i] {
                left += 1;
                right += 1;
            }

            fitted[i] = local_fit(xs, ys, i, left, right, robustness);

            if let Some(last) = last_fit {
                interpolate(xs, &mut fitted, last, i);
            }
            last_fit = Some(i);

            if i + 1 >= n {
                break;
            }
            let cut = xs[i] + self.delta;
            let mut next = i + 1;
            while next + 1 < n && xs[next + 1] <= cut {
                next += 1;
            }
            i = next;
        }

        fitted
    }
}

/// Weighted linear regression over `left..=right`, evaluated at `xs[i]`.
fn local_fit(xs: &[f64], ys: &[f64], i: usize, left: usize, right: usize, robustness: &[f64]) -> f64 {
    let x0 = xs[i];
    let radius = (x0 - xs[left]).max(xs[right] - x0);

    let kernel: Vec<f64> = (left..=right)
        .map(|j| {
            if radius > 0.0 {
                tricube((xs[j] - x0).abs() / radius)
            } else {
                1.0
            }
        })
        .collect();

    let mut weights: Vec<f64> = kernel
        .iter()
        .zip(&robustness[left..=right])
        .map(|(k, r)| k * r)
        .collect();
    let mut total: f64 = weights.iter().sum();

    // Every neighbour was rejected as an outlier; fit without robustness weights
    if total <= 0.0 {
        weights = kernel;
        total = weights.iter().sum();
    }

    let window = left..=right;
    let x_mean = window.clone().zip(&weights).map(|(j, w)| w * xs[j]).sum::<f64>() / total;
    let y_mean = window.clone().zip(&weights).map(|(j, w)| w * ys[j]).sum::<f64>() / total;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (j, w) in window.zip(&weights) {
        let dx = xs[j] - x_mean;
        sxx += w * dx * dx;
        sxy += w * dx * (ys[j] - y_mean);
    }

    // Degenerate x spread: fall back to the weighted mean
    let range = xs[right] - xs[left];
    if sxx <= 1e-12 * range * range * total {
        return y_mean;
    }

    y_mean + (sxy / sxx) * (x0 - x_mean)
}

/// Linearly fill `fitted[from+1..to]` between two fitted samples.
fn interpolate(xs: &[f64], fitted: &mut [f64], from: usize, to: usize) {
    if to <= from + 1 {
        return;
    }
    let dx = xs[to] - xs[from];
    for j in from + 1..to {
        fitted[j] = if dx > 0.0 {
            let t = (xs[j] - xs[from]) / dx;
            fitted[from] + t * (fitted[to] - fitted[from])
        } else {
            fitted[from]
        };
    }
}

#[inline]
fn tricube(u: f64) -> f64 {
    if u >= 1.0 {
        0.0
    } else {
        let v = 1.0 - u * u * u;
        v * v * v
    }
}

#[inline]
fn bisquare(u: f64) -> f64 {
    if u.abs() >= 1.0 {
        0.0
    } else {
        let v = 1.0 - u * u;
        v * v
    }
}

fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_linear_data_reproduced() {
        let xs: Vec<f64> = (0..40).map(|i| i as f64 * 2.0).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 0.5 * x + 100.0).collect();
        let fitted = Lowess::default().smooth(&xs, &ys).unwrap();
        for (f, y) in fitted.iter().zip(&ys) {
            assert!(approx_eq(*f, *y, 1e-6));
        }
    }

    #[test]
    fn test_delta_interpolation_on_linear_data() {
        let xs: Vec<f64> = (0..500).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 200.0 - 0.1 * x).collect();
        let lowess = Lowess { delta: 10.0, ..Lowess::default() };
        let fitted = lowess.smooth(&xs, &ys).unwrap();
        for (f, y) in fitted.iter().zip(&ys) {
            assert!(approx_eq(*f, *y, 1e-6));
        }
    }

    #[test]
    fn test_spike_is_not_followed() {
        let xs: Vec<f64> = (0..60).map(|i| i as f64).collect();
        let mut ys: Vec<f64> = xs.iter().map(|x| 300.0 + (x * 0.2).sin() * 5.0).collect();
        ys[30] += 80.0;
        let fitted = Lowess::default().smooth(&xs, &ys).unwrap();
        assert!((ys[30] - fitted[30]).abs() > 40.0);
        assert!((ys[20] - fitted[20]).abs() < 5.0);
    }

    #[test]
    fn test_duplicate_x_values() {
        let xs = vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 3.0, 3.0];
        let ys = vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 4.0];
        let lowess = Lowess { bandwidth: 0.5, ..Lowess::default() };
        let fitted = lowess.smooth(&xs, &ys).unwrap();
        assert!(fitted.iter().all(|f| f.is_finite()));
        assert!(approx_eq(fitted[4], 3.0, 1e-6));
    }

    #[test]
    fn test_short_input_returned_unchanged() {
        let fitted = Lowess::default().smooth(&[0.0, 1.0], &[5.0, 7.0]).unwrap();
        assert_eq!(fitted, vec![5.0, 7.0]);
        assert_eq!(Lowess::default().smooth(&[], &[]).unwrap(), Vec::<f64>::new());
    }

    #[test]
    fn test_rejects_bad_input() {
        let lowess = Lowess::default();
        assert!(lowess.smooth(&[0.0, 1.0, 2.0], &[1.0, 2.0]).is_none());
        assert!(lowess.smooth(&[0.0, 2.0, 1.0], &[1.0, 2.0, 3.0]).is_none());
        assert!(lowess.smooth(&[0.0, 1.0, 2.0], &[1.0, f64::NAN, 3.0]).is_none());
    }

    #[test]
    fn test_median() {
        assert_eq!(median(vec![3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(vec![4.0, 1.0, 2.0, 3.0]), 2.5);
        assert_eq!(median(vec![]), 0.0);
    }
}
