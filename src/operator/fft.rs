//! Radix-2 Cooley–Tukey FFT on [`num_complex::Complex64`] buffers.
use num_complex::Complex64;
use std::f64::consts::PI;

pub fn next_pow2(n: usize) -> usize {
    n.max(1).next_power_of_two()
}

/// In-place FFT; `buf.len()` must be a power of two. The inverse transform is
/// normalized by `1/N`.
pub fn fft(buf: &mut [Complex64], inverse: bool) {
    let n = buf.len();
    if n <= 1 {
        return;
    }
    debug_assert!(n.is_power_of_two());

    // bit reversal permutation
    let mut j = 0;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j |= bit;
        if i < j {
            buf.swap(i, j);
        }
    }

    let sign = if inverse { 1.0 } else { -1.0 };
    let mut len = 2;
    while len <= n {
        let w_len = Complex64::from_polar(1.0, sign * 2.0 * PI / len as f64);
        for start in (0..n).step_by(len) {
            let mut w = Complex64::new(1.0, 0.0);
            for k in 0..len / 2 {
                let u = buf[start + k];
                let v = buf[start + k + len / 2] * w;
                buf[start + k] = u + v;
                buf[start + k + len / 2] = u - v;
                w *= w_len;
            }
        }
        len <<= 1;
    }

    if inverse {
        let scale = 1.0 / n as f64;
        for z in buf.iter_mut() {
            *z *= scale;
        }
    }
}

/// Circular convolution of two real sequences of the same power-of-two length.
pub fn circular_convolution(a: &[f64], b: &[f64]) -> Vec<f64> {
    let n = a.len();
    let mut fa: Vec<Complex64> = a.iter().map(|&x| Complex64::new(x, 0.0)).collect();
    let mut fb: Vec<Complex64> = b.iter().map(|&x| Complex64::new(x, 0.0)).collect();
    fft(&mut fa, false);
    fft(&mut fb, false);
    for (x, y) in fa.iter_mut().zip(&fb) {
        *x *= y;
    }
    fft(&mut fa, true);
    fa.into_iter().take(n).map(|z| z.re).collect()
}

/// Full linear convolution (`a.len() + b.len() - 1` samples) through zero padding.
pub fn linear_convolution(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let full = a.len() + b.len() - 1;
    let n = next_pow2(full);
    let mut pa = a.to_vec();
    pa.resize(n, 0.0);
    let mut pb = b.to_vec();
    pb.resize(n, 0.0);
    let mut out = circular_convolution(&pa, &pb);
    out.truncate(full);
    out
}

#[cfg(test)]
mod fft_test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_fft_round_trip() {
        let x: Vec<Complex64> = (0..16).map(|i| Complex64::new((i as f64).sin(), 0.0)).collect();
        let mut y = x.clone();
        fft(&mut y, false);
        fft(&mut y, true);
        for (a, b) in x.iter().zip(&y) {
            assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-12);
            assert_abs_diff_eq!(b.im, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_linear_convolution_matches_direct() {
        let a = [1.0, 2.0, 3.0];
        let b = [0.0, 1.0, 0.5];
        let c = linear_convolution(&a, &b);
        let expected = [0.0, 1.0, 2.5, 4.0, 1.5];
        assert_eq!(c.len(), expected.len());
        for (x, y) in c.iter().zip(expected) {
            assert_abs_diff_eq!(*x, y, epsilon = 1e-12);
        }
    }
}
