//! Film: tone mapping, temporal accumulation and pixel packing.
//!
//! Radiance comes out of the integrator as per-pixel sums over samples.
//! The film turns those into 8-bit channels (`set_color`), optionally blends
//! them with earlier frames ([`Accumulator`]), and packs the result into
//! 32-bit pixels for presentation.
//!
//! Packed pixels hold red in the low byte and alpha in the high byte
//! (`0xAABBGGRR`), so their little-endian bytes read `r, g, b, a`.

use crate::error::{check_len, RenderResult};
use crate::Color;
use rayon::prelude::*;

/// Largest channel value before scaling to 8 bits.
pub const MAX_CHANNEL: f32 = 0.999;

/// Fully opaque alpha in the top byte.
pub const ALPHA_MASK: u32 = 0xFF00_0000;

/// Pixels packed per parallel work unit. Kept a multiple of four so only the
/// final unit has a scalar tail.
const PACK_CHUNK: usize = 1024;

/// Gamma 2 transfer. Non-positive and NaN inputs map to zero.
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

#[inline]
fn sample_scale(samples_per_pixel: u32) -> f32 {
    1.0 / samples_per_pixel.max(1) as f32
}

#[inline]
fn tone_map_channel(channel: f32, scale: f32) -> f32 {
    (linear_to_gamma(channel * scale).clamp(0.0, MAX_CHANNEL) * 256.0).trunc()
}

/// Tone map a summed pixel to 8-bit channel values in `[0, 255]`.
pub fn set_color(pixel: Color, samples_per_pixel: u32) -> Color {
    let scale = sample_scale(samples_per_pixel);
    Color::new(
        tone_map_channel(pixel.x, scale),
        tone_map_channel(pixel.y, scale),
        tone_map_channel(pixel.z, scale),
    )
}

/// Pack tone-mapped channels into an opaque `0xAABBGGRR` pixel.
#[inline]
pub fn pack_rgb(tone_mapped: Color) -> u32 {
    let r = (tone_mapped.x as u32).min(255);
    let g = (tone_mapped.y as u32).min(255);
    let b = (tone_mapped.z as u32).min(255);
    ALPHA_MASK | (b << 16) | (g << 8) | r
}

/// Tone map and pack one pixel.
#[inline]
pub fn pack_pixel(pixel: Color, samples_per_pixel: u32) -> u32 {
    pack_rgb(set_color(pixel, samples_per_pixel))
}

/// Split a packed pixel into `[r, g, b, a]`.
pub fn unpack_rgba(pixel: u32) -> [u8; 4] {
    pixel.to_le_bytes()
}

/// Tone map and pack a whole frame.
///
/// Work is spread over the rayon pool; within a chunk pixels go through the
/// four-wide vector path.
pub fn pack_pixels(colors: &[Color], out: &mut [u32], samples_per_pixel: u32) -> RenderResult<()> {
    check_len(colors.len(), out.len())?;
    let scale = sample_scale(samples_per_pixel);

    out.par_chunks_mut(PACK_CHUNK)
        .zip(colors.par_chunks(PACK_CHUNK))
        .for_each(|(dst, src)| {
            pack_span(src, dst, |quad| pack4(quad, scale), |c| tone_map_and_pack(c, scale))
        });

    Ok(())
}

/// Pack a frame whose channels are already tone mapped, such as the
/// [`Accumulator`] image. Same layout and parallelism as [`pack_pixels`].
pub fn pack_tone_mapped(tone_mapped: &[Color], out: &mut [u32]) -> RenderResult<()> {
    check_len(tone_mapped.len(), out.len())?;

    out.par_chunks_mut(PACK_CHUNK)
        .zip(tone_mapped.par_chunks(PACK_CHUNK))
        .for_each(|(dst, src)| pack_span(src, dst, pack4_mapped, pack_rgb));

    Ok(())
}

#[inline]
fn tone_map_and_pack(c: Color, scale: f32) -> u32 {
    pack_rgb(Color::new(
        tone_map_channel(c.x, scale),
        tone_map_channel(c.y, scale),
        tone_map_channel(c.z, scale),
    ))
}

fn pack_span(
    src: &[Color],
    dst: &mut [u32],
    quad: impl Fn([Color; 4]) -> [u32; 4],
    single: impl Fn(Color) -> u32,
) {
    let mut src_quads = src.chunks_exact(4);
    let mut dst_quads = dst.chunks_exact_mut(4);

    for (s, d) in (&mut src_quads).zip(&mut dst_quads) {
        d.copy_from_slice(&quad([s[0], s[1], s[2], s[3]]));
    }

    for (s, d) in src_quads.remainder().iter().zip(dst_quads.into_remainder()) {
        *d = single(*s);
    }
}

/// Tone map and pack four pixels at once.
#[cfg(target_arch = "x86_64")]
fn pack4(colors: [Color; 4], scale: f32) -> [u32; 4] {
    let [r, g, b] = sse2::channel_lanes(colors);
    sse2::pack(sse2::tone_map(r, scale), sse2::tone_map(g, scale), sse2::tone_map(b, scale))
}

/// Pack four already tone-mapped pixels at once.
#[cfg(target_arch = "x86_64")]
fn pack4_mapped(colors: [Color; 4]) -> [u32; 4] {
    let [r, g, b] = sse2::channel_lanes(colors);
    sse2::pack(r, g, b)
}

#[cfg(not(target_arch = "x86_64"))]
fn pack4(colors: [Color; 4], scale: f32) -> [u32; 4] {
    colors.map(|c| tone_map_and_pack(c, scale))
}

#[cfg(not(target_arch = "x86_64"))]
fn pack4_mapped(colors: [Color; 4]) -> [u32; 4] {
    colors.map(pack_rgb)
}

/// SSE2 lanes for the packing paths. Each lane holds one channel of one of
/// four pixels.
#[cfg(target_arch = "x86_64")]
mod sse2 {
    use super::{ALPHA_MASK, MAX_CHANNEL};
    use crate::Color;
    use std::arch::x86_64::*;

    /// Split four pixels into red, green and blue lanes.
    #[inline]
    pub(super) fn channel_lanes(colors: [Color; 4]) -> [__m128; 3] {
        let [c0, c1, c2, c3] = colors;
        // SAFETY: SSE2 is part of the x86_64 baseline.
        unsafe {
            [
                _mm_set_ps(c3.x, c2.x, c1.x, c0.x),
                _mm_set_ps(c3.y, c2.y, c1.y, c0.y),
                _mm_set_ps(c3.z, c2.z, c1.z, c0.z),
            ]
        }
    }

    /// Scale, gamma correct and clamp one channel, widened to `[0, 256)`.
    #[inline]
    pub(super) fn tone_map(lanes: __m128, scale: f32) -> __m128 {
        // SAFETY: SSE2 is part of the x86_64 baseline.
        unsafe {
            // _mm_max_ps returns its second operand for NaN lanes, so NaN maps to 0
            let v = _mm_mul_ps(lanes, _mm_set1_ps(scale));
            let v = _mm_sqrt_ps(_mm_max_ps(v, _mm_setzero_ps()));
            _mm_mul_ps(_mm_min_ps(v, _mm_set1_ps(MAX_CHANNEL)), _mm_set1_ps(256.0))
        }
    }

    /// Saturate tone-mapped lanes to `[0, 255]`, truncate and pack them as
    /// `0xAABBGGRR`.
    #[inline]
    pub(super) fn pack(r: __m128, g: __m128, b: __m128) -> [u32; 4] {
        let mut packed = [0u32; 4];

        // SAFETY: SSE2 is part of the x86_64 baseline, and the store writes
        // exactly the 16 bytes of `packed`.
        unsafe {
            let zero = _mm_setzero_ps();
            let top = _mm_set1_ps(255.0);
            // NaN lanes become 0 through _mm_max_ps, infinities saturate
            let byte = |lanes: __m128| _mm_cvttps_epi32(_mm_min_ps(_mm_max_ps(lanes, zero), top));

            let alpha = _mm_set1_epi32(ALPHA_MASK as i32);
            let rgba = _mm_or_si128(
                _mm_or_si128(alpha, _mm_slli_epi32(byte(b), 16)),
                _mm_or_si128(_mm_slli_epi32(byte(g), 8), byte(r)),
            );
            _mm_storeu_si128(packed.as_mut_ptr() as *mut __m128i, rgba);
        }

        packed
    }
}

/// Running average of tone-mapped frames.
///
/// Each frame is blended in with weight `1 / (frame_count + 1)`, so after
/// `n` frames the stored image is the mean of those `n` frames.
#[derive(Debug, Clone)]
pub struct Accumulator {
    previous: Vec<Color>,
    frame_count: u32,
}

impl Accumulator {
    pub fn new(pixel_count: usize) -> Self {
        Self {
            previous: vec![Color::ZERO; pixel_count],
            frame_count: 0,
        }
    }

    /// Forget all earlier frames.
    pub fn reset(&mut self) {
        self.previous.fill(Color::ZERO);
        self.frame_count = 0;
    }

    /// Frames blended since the last reset.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// The blended image in tone-mapped channel units.
    pub fn image(&self) -> &[Color] {
        &self.previous
    }

    /// Blend a frame of summed radiance into the history and pack the result.
    pub fn accumulate(&mut self, frame: &[Color], samples_per_pixel: u32, out: &mut [u32]) -> RenderResult<()> {
        check_len(self.previous.len(), frame.len())?;
        check_len(self.previous.len(), out.len())?;

        let weight = 1.0 / (self.frame_count as f32 + 1.0);

        self.previous.par_iter_mut().zip(frame.par_iter()).for_each(|(old, new)| {
            *old = *old * (1.0 - weight) + set_color(*new, samples_per_pixel) * weight;
        });
        self.frame_count = self.frame_count.saturating_add(1);

        pack_tone_mapped(&self.previous, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn reference_channel(c: f32, spp: u32) -> u32 {
        let v = c * (1.0 / spp as f32);
        let v = if v > 0.0 { v.sqrt() } else { 0.0 };
        (v.clamp(0.0, 0.999) * 256.0) as u32
    }

    fn edge_colors() -> Vec<Color> {
        vec![
            Color::ZERO,
            Color::ONE,
            Color::new(-1.0, -0.5, -1e-8),
            Color::new(1.5, 4.0, 100.0),
            Color::new(f32::NAN, 0.25, 0.5),
            Color::new(f32::INFINITY, f32::NEG_INFINITY, 0.04),
            Color::new(0.998, 0.999, 1.0),
        ]
    }

    #[test]
    fn test_linear_to_gamma() {
        assert_eq!(linear_to_gamma(0.25), 0.5);
        assert_eq!(linear_to_gamma(0.0), 0.0);
        assert_eq!(linear_to_gamma(-1.0), 0.0);
        assert_eq!(linear_to_gamma(f32::NAN), 0.0);
    }

    #[test]
    fn test_set_color_matches_reference() {
        for c in edge_colors() {
            for spp in [1, 4] {
                let mapped = set_color(c, spp);
                assert_eq!(mapped.x as u32, reference_channel(c.x, spp), "{:?}", c);
                assert_eq!(mapped.y as u32, reference_channel(c.y, spp), "{:?}", c);
                assert_eq!(mapped.z as u32, reference_channel(c.z, spp), "{:?}", c);
            }
        }
    }

    #[test]
    fn test_pack_layout() {
        let packed = pack_rgb(Color::new(255.0, 128.0, 1.0));
        assert_eq!(packed, 0xFF01_80FF);
        assert_eq!(unpack_rgba(packed), [255, 128, 1, 255]);

        // White radiance saturates at 255, black is opaque black
        assert_eq!(pack_pixel(Color::ONE, 1), 0xFFFF_FFFF);
        assert_eq!(pack_pixel(Color::ZERO, 1), ALPHA_MASK);
    }

    #[test]
    fn test_vector_path_matches_scalar() {
        let mut colors = edge_colors();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            colors.push(Color::new(
                rng.gen_range(-0.5..2.0),
                rng.gen_range(-0.5..2.0),
                rng.gen_range(-0.5..2.0),
            ));
        }

        for spp in [1, 3, 16] {
            let mut packed = vec![0u32; colors.len()];
            pack_pixels(&colors, &mut packed, spp).unwrap();

            for (c, p) in colors.iter().zip(&packed) {
                assert_eq!(*p, pack_pixel(*c, spp), "pixel {:?} spp {}", c, spp);
                let [r, g, b, a] = unpack_rgba(*p);
                assert_eq!(r as u32, reference_channel(c.x, spp));
                assert_eq!(g as u32, reference_channel(c.y, spp));
                assert_eq!(b as u32, reference_channel(c.z, spp));
                assert_eq!(a, 255);
            }
        }
    }

    #[test]
    fn test_tone_mapped_vector_path_matches_scalar() {
        let mut mapped = vec![
            Color::ZERO,
            Color::new(255.0, 128.0, 1.0),
            Color::new(255.7, 254.99, 0.5),
            Color::new(-3.0, 300.0, f32::NAN),
            Color::new(f32::INFINITY, f32::NEG_INFINITY, 12.25),
        ];
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..1001 {
            mapped.push(Color::new(
                rng.gen_range(-10.0..270.0),
                rng.gen_range(0.0..256.0),
                rng.gen_range(0.0..256.0),
            ));
        }

        let mut packed = vec![0u32; mapped.len()];
        pack_tone_mapped(&mapped, &mut packed).unwrap();
        for (c, p) in mapped.iter().zip(&packed) {
            assert_eq!(*p, pack_rgb(*c), "channels {:?}", c);
        }

        let mut short = vec![0u32; 3];
        assert!(pack_tone_mapped(&mapped, &mut short).is_err());
    }

    #[test]
    fn test_accumulated_pixels_follow_image() {
        // Odd length so both the four-wide path and the tail are used
        let pixels = 4099;
        let mut rng = StdRng::seed_from_u64(5);
        let mut acc = Accumulator::new(pixels);
        let mut packed = vec![0u32; pixels];

        for _ in 0..3 {
            let frame: Vec<Color> = (0..pixels)
                .map(|_| Color::new(rng.gen_range(-0.1..1.2), rng.gen(), rng.gen()))
                .collect();
            acc.accumulate(&frame, 2, &mut packed).unwrap();

            let expected: Vec<u32> = acc.image().iter().map(|c| pack_rgb(*c)).collect();
            assert_eq!(packed, expected);
        }
    }

    #[test]
    fn test_pack_pixels_length_mismatch() {
        let colors = vec![Color::ONE; 5];
        let mut packed = vec![0u32; 4];
        assert!(pack_pixels(&colors, &mut packed, 1).is_err());
    }

    #[test]
    fn test_first_frame_has_full_weight() {
        let frame = vec![Color::new(0.25, 1.0, 0.0), Color::splat(0.04)];
        let mut acc = Accumulator::new(frame.len());
        let mut packed = vec![0u32; frame.len()];

        acc.accumulate(&frame, 1, &mut packed).unwrap();

        assert_eq!(acc.frame_count(), 1);
        assert_eq!(acc.image()[0], set_color(frame[0], 1));
        assert_eq!(packed[0], pack_pixel(frame[0], 1));
        assert_eq!(packed[1], pack_pixel(frame[1], 1));
    }

    #[test]
    fn test_accumulation_is_running_mean() {
        let mut acc = Accumulator::new(1);
        let mut packed = [0u32; 1];

        // Tone maps to 64 then 192
        acc.accumulate(&[Color::splat(0.0625)], 1, &mut packed).unwrap();
        acc.accumulate(&[Color::splat(0.5625)], 1, &mut packed).unwrap();

        let mean = acc.image()[0];
        assert!((mean.x - 128.0).abs() < 1e-3, "mean was {:?}", mean);
        assert_eq!(unpack_rgba(packed[0])[0], 128);
    }

    #[test]
    fn test_accumulation_reduces_variance() {
        let pixels = 4096;
        let mut rng = StdRng::seed_from_u64(42);
        let mut acc = Accumulator::new(pixels);
        let mut packed = vec![0u32; pixels];

        let variance = |image: &[Color]| {
            let n = image.len() as f32;
            let mean = image.iter().map(|c| c.x).sum::<f32>() / n;
            image.iter().map(|c| (c.x - mean).powi(2)).sum::<f32>() / n
        };

        // Every pixel sees the same noisy distribution each frame
        let mut last = f32::INFINITY;
        for _ in 0..8 {
            let frame: Vec<Color> = (0..pixels).map(|_| Color::splat(rng.gen::<f32>())).collect();
            acc.accumulate(&frame, 1, &mut packed).unwrap();

            let v = variance(acc.image());
            assert!(v < last, "variance rose from {} to {}", last, v);
            last = v;
        }
        assert_eq!(acc.frame_count(), 8);
    }

    #[test]
    fn test_reset() {
        let mut acc = Accumulator::new(2);
        let mut packed = vec![0u32; 2];
        acc.accumulate(&[Color::ONE, Color::ONE], 1, &mut packed).unwrap();

        acc.reset();
        assert_eq!(acc.frame_count(), 0);
        assert!(acc.image().iter().all(|c| *c == Color::ZERO));

        // Next frame replaces the history outright
        acc.accumulate(&[Color::splat(0.25), Color::ZERO], 1, &mut packed).unwrap();
        assert_eq!(acc.image()[0], Color::splat(128.0));
    }
}
