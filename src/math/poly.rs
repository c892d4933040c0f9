//! Dense real polynomials in ascending-coefficient order.
//!
//! `coeffs[k]` multiplies `p^k`. Only the handful of operations needed by the
//! Cauer continued-fraction expansion are provided.

/// Product `Π (1 + a_i p)` for the given roots-in-reciprocal form.
pub fn product_of_linear(a: &[f64]) -> Vec<f64> {
    let mut out = vec![1.0];
    for &ai in a {
        out = mul_linear(&out, ai);
    }
    out
}

/// Multiply `poly` by `(1 + a p)`.
pub fn mul_linear(poly: &[f64], a: f64) -> Vec<f64> {
    let mut out = vec![0.0; poly.len() + 1];
    for (k, &c) in poly.iter().enumerate() {
        out[k] += c;
        out[k + 1] += a * c;
    }
    out
}

/// `x += scale * y`, growing `x` as needed.
pub fn add_scaled(x: &mut Vec<f64>, y: &[f64], scale: f64) {
    if x.len() < y.len() {
        x.resize(y.len(), 0.0);
    }
    for (xi, &yi) in x.iter_mut().zip(y.iter()) {
        *xi += scale * yi;
    }
}

/// Leading (highest-degree) coefficient; `0.0` for an empty polynomial.
pub fn leading(poly: &[f64]) -> f64 {
    poly.last().copied().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_of_linear_expands() {
        // (1 + 2p)(1 + 3p) = 1 + 5p + 6p^2
        let p = product_of_linear(&[2.0, 3.0]);
        assert_eq!(p, vec![1.0, 5.0, 6.0]);
    }

    #[test]
    fn add_scaled_grows() {
        let mut x = vec![1.0];
        add_scaled(&mut x, &[1.0, 2.0], -2.0);
        assert_eq!(x, vec![-1.0, -4.0]);
    }

    #[test]
    fn mul_linear_and_leading() {
        assert_eq!(mul_linear(&[1.0, 1.0], 2.0), vec![1.0, 3.0, 2.0]);
        assert_eq!(leading(&[1.0, 3.0, 2.0]), 2.0);
        assert_eq!(leading(&[]), 0.0);
    }
}
