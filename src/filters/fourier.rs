//! Discrete Fourier transform primitive.
//!
//! Unnormalised transforms with the usual sign convention: forward uses
//! `exp(-2 pi i jk / n)`, backward `exp(+2 pi i jk / n)`, so a forward pass
//! followed by a backward pass scales by `n`. Planning and execution are
//! delegated to `rustfft`, which handles every length.

use num_complex::Complex64;
use rustfft::{FftDirection, FftPlanner};

use crate::image::TypedArray;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl From<Direction> for FftDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Forward => FftDirection::Forward,
            Direction::Backward => FftDirection::Inverse,
        }
    }
}

/// In-place 1-D transform of any length.
pub fn fft_1d(buf: &mut [Complex64], direction: Direction) {
    if buf.len() <= 1 {
        return;
    }
    let fft = FftPlanner::<f64>::new().plan_fft(buf.len(), direction.into());
    fft.process(buf);
}

/// Transform along every axis of `image` in place.
pub fn fft_nd(image: &TypedArray<Complex64>, direction: Direction) {
    let mut planner = FftPlanner::<f64>::new();
    for axis in 0..image.rank() {
        let len = image.shape()[axis];
        if len <= 1 {
            continue;
        }
        let fft = planner.plan_fft(len, direction.into());
        let mut scratch = vec![Complex64::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        let mut line = Vec::with_capacity(len);
        image.for_each_row_mut(axis, |mut row| {
            line.clear();
            line.extend((0..row.len()).map(|i| row.get(i)));
            fft.process_with_scratch(&mut line, &mut scratch);
            row.write_from(&line);
        });
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use super::*;

    fn naive_dft(input: &[Complex64], direction: Direction) -> Vec<Complex64> {
        let n = input.len();
        let sign = match direction {
            Direction::Forward => -1.0,
            Direction::Backward => 1.0,
        };
        (0..n)
            .map(|k| {
                input
                    .iter()
                    .enumerate()
                    .map(|(j, &x)| {
                        let angle = sign * 2.0 * PI * (j * k) as f64 / n as f64;
                        x * Complex64::from_polar(1.0, angle)
                    })
                    .sum()
            })
            .collect()
    }

    fn signal(n: usize) -> Vec<Complex64> {
        (0..n)
            .map(|i| Complex64::new((i as f64 * 0.7).sin() + 1.0, (i as f64 * 0.3).cos()))
            .collect()
    }

    #[test]
    fn test_matches_naive_dft() {
        for n in [1, 2, 3, 5, 8, 12, 16, 17] {
            for direction in [Direction::Forward, Direction::Backward] {
                let input = signal(n);
                let expected = naive_dft(&input, direction);
                let mut actual = input.clone();
                fft_1d(&mut actual, direction);
                for (a, e) in actual.iter().zip(&expected) {
                    assert!((a - e).norm() < 1e-9, "n={n} {direction:?}: {a} vs {e}");
                }
            }
        }
    }

    #[test]
    fn test_nd_matches_naive_dft_along_rows() {
        // 1 x n image: only axis 1 has extent
        let input = signal(7);
        let image = TypedArray::<Complex64>::from_vec(&[1, 7], input.clone());
        fft_nd(&image, Direction::Forward);
        let expected = naive_dft(&input, Direction::Forward);
        for (a, e) in image.to_vec().iter().zip(&expected) {
            assert!((a - e).norm() < 1e-9);
        }
    }

    #[test]
    fn test_round_trip_scales_by_length() {
        let input = signal(10);
        let mut buf = input.clone();
        fft_1d(&mut buf, Direction::Forward);
        fft_1d(&mut buf, Direction::Backward);
        for (a, e) in buf.iter().zip(&input) {
            assert!((a / 10.0 - e).norm() < 1e-12);
        }
    }

    #[test]
    fn test_nd_transform_of_impulse_is_flat() {
        let image = TypedArray::<Complex64>::new(&[3, 4]);
        image.set(&[0, 0], Complex64::new(1.0, 0.0));
        fft_nd(&image, Direction::Forward);
        for v in image.to_vec() {
            assert!((v - Complex64::new(1.0, 0.0)).norm() < 1e-12);
        }
    }

    #[test]
    fn test_nd_transform_is_separable() {
        // a shift of one sample along axis 1 multiplies by a phase ramp
        let image = TypedArray::<Complex64>::new(&[2, 4]);
        image.set(&[0, 1], Complex64::new(1.0, 0.0));
        fft_nd(&image, Direction::Forward);
        let expected = Complex64::from_polar(1.0, -2.0 * PI / 4.0);
        assert!((image.get(&[1, 1]) - expected).norm() < 1e-12);
    }
}
