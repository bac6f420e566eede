//! 2D DFT/IDFT with zero-frequency centering.
//!
//! Rows-then-columns passes over `rustfft` plans. The forward transform pads
//! the input plane to power-of-two dimensions and returns the spectrum with
//! the DC term shifted to the plane's midpoint; the inverse undoes the shift,
//! applies the 1/(w*h) scaling, and returns the raw spatial plane at padded
//! size (callers crop to the original dimensions).

use ndarray::Array2;
use rustfft::{num_complex::Complex, FftPlanner};

use super::{next_power_of_two, pad_to};

/// Forward padded 2D DFT, returning the centered spectrum and padded size.
pub fn forward_dft(gray: &Array2<f32>) -> (Array2<Complex<f32>>, (usize, usize)) {
    let (h, w) = gray.dim();
    let ph = next_power_of_two(h);
    let pw = next_power_of_two(w);
    let padded = pad_to(gray, ph, pw);

    let mut data: Vec<Complex<f32>> = padded.iter().map(|&v| Complex::new(v, 0.0)).collect();

    let mut planner = FftPlanner::new();
    let fft_row = planner.plan_fft_forward(pw);
    let fft_col = planner.plan_fft_forward(ph);

    for row in data.chunks_exact_mut(pw) {
        fft_row.process(row);
    }

    let mut col = vec![Complex::new(0.0f32, 0.0); ph];
    for j in 0..pw {
        for i in 0..ph {
            col[i] = data[i * pw + j];
        }
        fft_col.process(&mut col);
        for i in 0..ph {
            data[i * pw + j] = col[i];
        }
    }

    let spectrum = Array2::from_shape_vec((ph, pw), data).expect("padded shape is exact");
    (fft_shift(&spectrum), (pw, ph))
}

/// Inverse 2D DFT of a centered spectrum, returning the raw spatial plane at
/// padded size. Only the real part is kept.
pub fn inverse_dft(shifted: &Array2<Complex<f32>>) -> Array2<f32> {
    let unshifted = ifft_shift(shifted);
    let (ph, pw) = unshifted.dim();
    let mut data: Vec<Complex<f32>> = unshifted.iter().copied().collect();

    let mut planner = FftPlanner::new();
    let ifft_row = planner.plan_fft_inverse(pw);
    let ifft_col = planner.plan_fft_inverse(ph);

    let mut col = vec![Complex::new(0.0f32, 0.0); ph];
    for j in 0..pw {
        for i in 0..ph {
            col[i] = data[i * pw + j];
        }
        ifft_col.process(&mut col);
        for i in 0..ph {
            data[i * pw + j] = col[i];
        }
    }

    for row in data.chunks_exact_mut(pw) {
        ifft_row.process(row);
    }

    let scale = 1.0 / (ph * pw) as f32;
    let real: Vec<f32> = data.into_iter().map(|c| c.re * scale).collect();
    Array2::from_shape_vec((ph, pw), real).expect("padded shape is exact")
}

/// Quadrant swap moving the zero-frequency term to the plane's midpoint.
pub fn fft_shift(spectrum: &Array2<Complex<f32>>) -> Array2<Complex<f32>> {
    let (h, w) = spectrum.dim();
    let mut out = Array2::from_elem((h, w), Complex::new(0.0f32, 0.0));
    for i in 0..h {
        for j in 0..w {
            out[[(i + h / 2) % h, (j + w / 2) % w]] = spectrum[[i, j]];
        }
    }
    out
}

/// Exact inverse of [`fft_shift`], valid for odd sizes too.
pub fn ifft_shift(spectrum: &Array2<Complex<f32>>) -> Array2<Complex<f32>> {
    let (h, w) = spectrum.dim();
    let mut out = Array2::from_elem((h, w), Complex::new(0.0f32, 0.0));
    for i in 0..h {
        for j in 0..w {
            out[[i, j]] = spectrum[[(i + h / 2) % h, (j + w / 2) % w]];
        }
    }
    out
}
