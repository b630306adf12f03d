//! Stationarity and invertibility checks for ARMA polynomials.
//!
//! Both use the Schur-Cohn step-down recursion: the polynomial
//! `1 - a_1 z - ... - a_k z^k` has all roots outside the unit circle iff every
//! reflection coefficient produced by stepping the order down has modulus
//! below one.

const MAX_REFLECTION: f64 = 1.0 - 1e-6;

/// True when `1 - a_1 z - ... - a_k z^k` has all roots outside the unit circle.
fn roots_outside_unit_circle(coefficients: &[f64]) -> bool {
    let mut a: Vec<f64> = coefficients.to_vec();
    while a.last() == Some(&0.0) {
        a.pop();
    }

    while let Some(&kappa) = a.last() {
        if !kappa.is_finite() || kappa.abs() >= MAX_REFLECTION {
            return false;
        }
        let k = a.len();
        let denom = 1.0 - kappa * kappa;
        let prev: Vec<f64> = (0..k - 1)
            .map(|j| (a[j] + kappa * a[k - 2 - j]) / denom)
            .collect();
        a = prev;
    }
    true
}

/// AR polynomial `1 - φ_1 B - ... - φ_p B^p` is stationary.
pub fn is_stationary(ar: &[f64]) -> bool {
    roots_outside_unit_circle(ar)
}

/// MA polynomial `1 + θ_1 B + ... + θ_q B^q` is invertible.
pub fn is_invertible(ma: &[f64]) -> bool {
    let negated: Vec<f64> = ma.iter().map(|t| -t).collect();
    roots_outside_unit_circle(&negated)
}
