//! Random sampling for the path tracer.
//!
//! Two generators feed the same sampling helpers through `RngCore`:
//!
//! - the global stream, `rand::thread_rng()`, fast but not reproducible
//! - [`PcgHash`], a 32-bit hash-based permutation keyed by an explicit seed.
//!   Each pixel gets its own seed, so a pixel's samples do not depend on which
//!   worker thread rendered it.

use lumen_math::Vec3;
use rand::RngCore;

/// Attempts made by rejection sampling before giving up.
pub const MAX_REJECTION_ATTEMPTS: usize = 100;

/// PCG-style hash generator with 32 bits of state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcgHash {
    state: u32,
}

impl PcgHash {
    /// Create a generator from an explicit seed.
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Seed for pixel `(x, y)` of an image `width` pixels wide.
    ///
    /// `frame` offsets the seed by whole images so successive frames of an
    /// accumulating render draw fresh samples; frame 0 uses the linear pixel
    /// index `y * width + x` unchanged.
    pub fn for_pixel(x: u32, y: u32, width: u32, height: u32, frame: u32) -> Self {
        let index = y.wrapping_mul(width).wrapping_add(x);
        let offset = frame.wrapping_mul(width.wrapping_mul(height));
        Self::new(index.wrapping_add(offset))
    }
}

impl RngCore for PcgHash {
    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
        let state = self.state;
        let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
        (word >> 22) ^ word
    }

    fn next_u64(&mut self) -> u64 {
        let lo = self.next_u32() as u64;
        let hi = self.next_u32() as u64;
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// Uniform float in [0, 1].
#[inline]
pub fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    (rng.next_u32() as f64 / u32::MAX as f64) as f32
}

/// Uniform float in [min, max].
#[inline]
pub fn gen_range(rng: &mut dyn RngCore, min: f32, max: f32) -> f32 {
    min + (max - min) * gen_f32(rng)
}

/// Random point strictly inside the unit sphere.
///
/// Gives up after [`MAX_REJECTION_ATTEMPTS`] draws and returns the zero vector.
pub fn random_in_unit_sphere(rng: &mut dyn RngCore) -> Vec3 {
    for _ in 0..MAX_REJECTION_ATTEMPTS {
        let p = Vec3::new(
            gen_range(rng, -1.0, 1.0),
            gen_range(rng, -1.0, 1.0),
            gen_range(rng, -1.0, 1.0),
        );
        if p.length_squared() < 1.0 {
            return p;
        }
    }
    Vec3::ZERO
}

/// Random direction on the unit sphere, or zero if sampling gave up.
pub fn random_unit_vector(rng: &mut dyn RngCore) -> Vec3 {
    random_in_unit_sphere(rng).normalize_or_zero()
}
