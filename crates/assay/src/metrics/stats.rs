//! Numeric helpers shared by the metric groups.
//!
//! All functions take plain slices of finite values. Degenerate inputs
//! (empty slices, zero variance) return `NaN` or `None` rather than panicking;
//! callers map those to "No data" style results.

use std::cmp::Ordering;
use std::f64::consts::{FRAC_1_SQRT_2, PI};

// =============================================================================
// MOMENTS
// =============================================================================

/// Arithmetic mean; `NaN` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Variance with `ddof` delta degrees of freedom; `NaN` when `n <= ddof`.
pub fn variance(values: &[f64], ddof: usize) -> f64 {
    let n = values.len();
    if n <= ddof {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - ddof) as f64
}

/// Standard deviation with `ddof` delta degrees of freedom.
pub fn std_dev(values: &[f64], ddof: usize) -> f64 {
    variance(values, ddof).sqrt()
}

/// Biased sample skewness (g1).
pub fn skewness(values: &[f64]) -> f64 {
    let (m2, m3, _) = central_moments(values);
    m3 / m2.powf(1.5)
}

/// Biased excess kurtosis (g2).
pub fn kurtosis(values: &[f64]) -> f64 {
    let (m2, _, m4) = central_moments(values);
    m4 / (m2 * m2) - 3.0
}

fn central_moments(values: &[f64]) -> (f64, f64, f64) {
    let n = values.len() as f64;
    let m = mean(values);
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for v in values {
        let d = v - m;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    (m2 / n, m3 / n, m4 / n)
}

/// Population z-scores; `None` when the standard deviation is zero or undefined.
pub fn z_scores(values: &[f64]) -> Option<Vec<f64>> {
    let m = mean(values);
    let sd = std_dev(values, 0);
    if !sd.is_finite() || sd == 0.0 {
        return None;
    }
    Some(values.iter().map(|v| (v - m) / sd).collect())
}

// =============================================================================
// ORDER STATISTICS
// =============================================================================

/// Sort a copy ascending.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    out
}

/// Quantile of sorted data with linear interpolation between closest ranks.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            let frac = pos - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

/// Median; `NaN` for an empty slice.
pub fn median(values: &[f64]) -> f64 {
    quantile_sorted(&sorted(values), 0.5)
}

/// Split into `parts` contiguous chunks; the first `len % parts` chunks get one extra element.
pub fn split_even(values: &[f64], parts: usize) -> Vec<&[f64]> {
    if parts == 0 {
        return Vec::new();
    }
    let base = values.len() / parts;
    let extra = values.len() % parts;
    let mut chunks = Vec::with_capacity(parts);
    let mut start = 0;
    for i in 0..parts {
        let len = base + usize::from(i < extra);
        chunks.push(&values[start..start + len]);
        start += len;
    }
    chunks
}

// =============================================================================
// CORRELATION AND TREND
// =============================================================================

/// Pearson correlation; `NaN` when either side has zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return f64::NAN;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let mx = mean(x);
    let my = mean(y);
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }
    sxy / (sxx * syy).sqrt()
}

/// Lag-1 autocorrelation: Pearson correlation of the series with itself shifted by one.
pub fn autocorrelation_lag1(values: &[f64]) -> f64 {
    if values.len() < 3 {
        return f64::NAN;
    }
    pearson(&values[1..], &values[..values.len() - 1])
}

/// Least-squares slope of `y` against `x`.
pub fn slope(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return f64::NAN;
    }
    let mx = mean(&x[..n]);
    let my = mean(&y[..n]);
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (a, b) in x.iter().zip(y).take(n) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
    }
    sxy / sxx
}

// =============================================================================
// NORMAL DISTRIBUTION
// =============================================================================

/// Complementary error function (Chebyshev fit, fractional error < 1.2e-7).
fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let r = t
        * (-z * z - 1.265_512_23
            + t * (1.000_023_68
                + t * (0.374_091_96
                    + t * (0.096_784_18
                        + t * (-0.186_288_06
                            + t * (0.278_868_07
                                + t * (-1.135_203_98
                                    + t * (1.488_515_87
                                        + t * (-0.822_152_23 + t * 0.170_872_77)))))))))
            .exp();
    if x >= 0.0 { r } else { 2.0 - r }
}

/// Standard normal CDF.
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z * FRAC_1_SQRT_2)
}

/// Standard normal upper tail, `P(Z > z)`.
pub fn normal_sf(z: f64) -> f64 {
    0.5 * erfc(z * FRAC_1_SQRT_2)
}

/// Inverse standard normal CDF (Acklam's rational approximation).
pub fn normal_quantile(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_69e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.024_25;

    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}

// =============================================================================
// SHAPIRO-WILK
// =============================================================================
// Royston (1995), Algorithm AS R94.

const SW_C1: [f64; 6] = [0.0, 0.221_157, -0.147_981, -2.071_19, 4.434_685, -2.706_056];
const SW_C2: [f64; 6] = [0.0, 0.042_981, -0.293_762, -1.752_461, 5.682_633, -3.582_633];
const SW_C3: [f64; 4] = [0.544, -0.399_78, 0.025_054, -6.714e-4];
const SW_C4: [f64; 4] = [1.3822, -0.778_57, 0.062_767, -0.002_032_2];
const SW_C5: [f64; 4] = [-1.5861, -0.310_82, -0.083_751, 0.003_891_5];
const SW_C6: [f64; 3] = [-0.4803, -0.082_676, 0.003_030_2];
const SW_G: [f64; 2] = [-2.273, 0.459];

fn poly(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Result of a Shapiro-Wilk normality test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapiroWilk {
    pub w: f64,
    pub p_value: f64,
}

/// Shapiro-Wilk test; `None` for fewer than 3 values.
///
/// Constant data yields `W = 1` and `p = 1`.
pub fn shapiro_wilk(values: &[f64]) -> Option<ShapiroWilk> {
    let n = values.len();
    if n < 3 {
        return None;
    }

    let x = sorted(values);
    let range = x[n - 1] - x[0];
    if range <= f64::EPSILON * x[n - 1].abs().max(1.0) {
        return Some(ShapiroWilk { w: 1.0, p_value: 1.0 });
    }

    let half = shapiro_coefficients(n);

    let m = mean(&x);
    let ss: f64 = x.iter().map(|v| (v - m).powi(2)).sum();
    let numerator: f64 = half
        .iter()
        .enumerate()
        .map(|(i, a)| a * (x[n - 1 - i] - x[i]))
        .sum();
    let w = (numerator * numerator / ss).clamp(0.0, 1.0);

    Some(ShapiroWilk { w, p_value: shapiro_p_value(w, n) })
}

/// Positive half of the normalized coefficient vector, largest first.
fn shapiro_coefficients(n: usize) -> Vec<f64> {
    if n == 3 {
        return vec![FRAC_1_SQRT_2];
    }

    let half = n / 2;
    let an25 = n as f64 + 0.25;
    let m: Vec<f64> = (1..=half)
        .map(|i| -normal_quantile((i as f64 - 0.375) / an25))
        .collect();
    let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / (n as f64).sqrt();

    let mut a = vec![0.0; half];
    a[0] = m[0] / ssumm2 + poly(&SW_C1, rsn);

    let (first, fac) = if n > 5 {
        a[1] = m[1] / ssumm2 + poly(&SW_C2, rsn);
        let fac = ((summ2 - 2.0 * m[0].powi(2) - 2.0 * m[1].powi(2))
            / (1.0 - 2.0 * a[0].powi(2) - 2.0 * a[1].powi(2)))
        .sqrt();
        (2, fac)
    } else {
        let fac = ((summ2 - 2.0 * m[0].powi(2)) / (1.0 - 2.0 * a[0].powi(2))).sqrt();
        (1, fac)
    };

    for i in first..half {
        a[i] = m[i] / fac;
    }
    a
}

fn shapiro_p_value(w: f64, n: usize) -> f64 {
    if n == 3 {
        let p = 6.0 / PI * (w.sqrt().asin() - PI / 3.0);
        return p.clamp(0.0, 1.0);
    }
    if w >= 1.0 {
        return 1.0;
    }

    let nf = n as f64;
    let mut y = (1.0 - w).ln();
    let (m, s) = if n <= 11 {
        let gamma = poly(&SW_G, nf);
        if y >= gamma {
            return 1e-99;
        }
        y = -(gamma - y).ln();
        (poly(&SW_C3, nf), poly(&SW_C4, nf).exp())
    } else {
        let ln_n = nf.ln();
        (poly(&SW_C5, ln_n), poly(&SW_C6, ln_n).exp())
    };

    normal_sf((y - m) / s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn test_moments() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&v), 5.0);
        assert_eq!(std_dev(&v, 0), 2.0);
        assert!(close(variance(&v, 1), 32.0 / 7.0, 1e-12));
        assert!(mean(&[]).is_nan());
        assert!(variance(&[1.0], 1).is_nan());
    }

    #[test]
    fn test_skew_and_kurtosis() {
        assert!(close(skewness(&[1.0, 2.0, 3.0]), 0.0, 1e-12));
        assert!(skewness(&[1.0, 1.0, 1.0, 10.0]) > 1.0);
        // Uniform-ish data has negative excess kurtosis
        assert!(close(kurtosis(&[1.0, 2.0, 3.0, 4.0]), -1.36, 1e-9));
    }

    #[test]
    fn test_quantiles() {
        let s = sorted(&[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(quantile_sorted(&s, 0.25), 1.75);
        assert_eq!(quantile_sorted(&s, 0.5), 2.5);
        assert_eq!(quantile_sorted(&s, 0.75), 3.25);
        assert_eq!(median(&[5.0]), 5.0);
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn test_split_even() {
        let v: Vec<f64> = (0..12).map(f64::from).collect();
        let lens: Vec<usize> = split_even(&v, 5).iter().map(|c| c.len()).collect();
        assert_eq!(lens, vec![3, 3, 2, 2, 2]);
        let lens: Vec<usize> = split_even(&v[..3], 5).iter().map(|c| c.len()).collect();
        assert_eq!(lens, vec![1, 1, 1, 0, 0]);
    }

    #[test]
    fn test_correlation_and_slope() {
        let x = [1.0, 2.0, 3.0, 4.0];
        assert!(close(pearson(&x, &[2.0, 4.0, 6.0, 8.0]), 1.0, 1e-12));
        assert!(close(pearson(&x, &[8.0, 6.0, 4.0, 2.0]), -1.0, 1e-12));
        assert!(pearson(&x, &[1.0, 1.0, 1.0, 1.0]).is_nan());
        assert!(close(slope(&x, &[3.0, 5.0, 7.0, 9.0]), 2.0, 1e-12));
        assert!(close(autocorrelation_lag1(&[1.0, 2.0, 3.0, 4.0, 5.0]), 1.0, 1e-12));
    }

    #[test]
    fn test_normal_distribution() {
        assert!(close(normal_cdf(0.0), 0.5, 1e-7));
        assert!(close(normal_cdf(1.959_964), 0.975, 1e-6));
        assert!(close(normal_sf(1.0), 0.158_655_25, 1e-6));
        assert!(close(normal_quantile(0.975), 1.959_964, 1e-6));
        assert!(close(normal_quantile(0.01), -2.326_348, 1e-6));
    }

    #[test]
    fn test_shapiro_coefficients_are_normalized() {
        for n in [4, 5, 6, 11, 12, 50] {
            let a = shapiro_coefficients(n);
            let total: f64 = 2.0 * a.iter().map(|v| v * v).sum::<f64>();
            assert!(close(total, 1.0, 1e-6), "n = {n}: {total}");
        }
    }

    #[test]
    fn test_shapiro_coefficients_match_published_table() {
        // Shapiro & Wilk (1965), n = 10
        let expected = [0.5739, 0.3291, 0.2141, 0.1224, 0.0399];
        let a = shapiro_coefficients(10);
        assert_eq!(a.len(), expected.len());
        for (got, want) in a.iter().zip(expected) {
            assert!(close(*got, want, 0.005), "{a:?}");
        }
    }

    #[test]
    fn test_shapiro_wilk_reference_sample() {
        let values = [
            148.0, 154.0, 158.0, 160.0, 161.0, 162.0, 166.0, 170.0, 182.0, 195.0, 236.0,
        ];
        let result = shapiro_wilk(&values).unwrap();
        assert!(close(result.w, 0.789, 0.01), "W = {}", result.w);
        assert!(result.p_value > 0.001 && result.p_value < 0.02, "p = {}", result.p_value);
    }

    #[test]
    fn test_shapiro_wilk_normal_like_data() {
        // Evenly spaced normal quantiles look normal
        let values: Vec<f64> = (1..=50)
            .map(|i| normal_quantile((i as f64 - 0.5) / 50.0))
            .collect();
        let result = shapiro_wilk(&values).unwrap();
        assert!(result.w > 0.98);
        assert!(result.p_value > 0.5);
    }

    #[test]
    fn test_shapiro_wilk_skewed_data() {
        let values: Vec<f64> = (0..40).map(|i| (i as f64 / 4.0).exp()).collect();
        let result = shapiro_wilk(&values).unwrap();
        assert!(result.w < 0.8);
        assert!(result.p_value < 0.01);
    }

    #[test]
    fn test_shapiro_wilk_small_samples() {
        assert!(shapiro_wilk(&[1.0, 2.0]).is_none());

        let three = shapiro_wilk(&[1.0, 2.0, 3.0]).unwrap();
        assert!(close(three.w, 1.0, 1e-9));
        assert!(close(three.p_value, 1.0, 1e-6));

        let constant = shapiro_wilk(&[4.0, 4.0, 4.0, 4.0]).unwrap();
        assert_eq!(constant.p_value, 1.0);

        let four = shapiro_wilk(&[1.0, 2.0, 3.0, 10.0]).unwrap();
        assert!(close(four.w, 0.807, 0.005), "W = {}", four.w);
        assert!(close(four.p_value, 0.115, 0.01), "p = {}", four.p_value);
    }
}
