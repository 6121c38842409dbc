use fastnoise_lite::{FastNoiseLite, NoiseType};
use glam::{Vec2, Vec3, Vec4};

/// Step used by the central differences in [`NoiseField::curl`], in the same
/// coordinate units as the noise call.
pub const CURL_EPSILON: f32 = 0.01;

// ---------------------------------------------------------------------------
// NoiseField: a pure scalar field over the plane
// ---------------------------------------------------------------------------

/// Deterministic, smooth scalar noise over continuous 2D coordinates.
///
/// Implementations must be pure: the same coordinate always yields the same
/// value, with no hidden state. Output lies in roughly `[-1, 1]`.
pub trait NoiseField: Send + Sync {
    fn sample(&self, p: Vec2) -> f32;

    /// Divergence-free flow vector `(∂n/∂y, -∂n/∂x)` estimated by central
    /// differences at [`CURL_EPSILON`].
    ///
    /// The magnitude is only meaningful relative to the epsilon; callers treat
    /// it as a direction-with-magnitude and rescale it themselves.
    fn curl(&self, p: Vec2) -> Vec2 {
        let e = CURL_EPSILON;
        let dn_dx = (self.sample(Vec2::new(p.x + e, p.y)) - self.sample(Vec2::new(p.x - e, p.y)))
            / (2.0 * e);
        let dn_dy = (self.sample(Vec2::new(p.x, p.y + e)) - self.sample(Vec2::new(p.x, p.y - e)))
            / (2.0 * e);
        Vec2::new(dn_dy, -dn_dx)
    }
}

// ---------------------------------------------------------------------------
// Simplex: the lattice the GPU shader ports
// ---------------------------------------------------------------------------

/// 2D simplex noise with a mod-289 permutation polynomial as the lattice hash.
///
/// This is the field `organic_gradient.wgsl` evaluates; keep the two in sync
/// line for line.
#[derive(Debug, Clone, Copy, Default)]
pub struct Simplex;

const C: Vec4 = Vec4::new(
    0.211_324_87,  // (3 - sqrt(3)) / 6
    0.366_025_4,   // (sqrt(3) - 1) / 2
    -0.577_350_26, // -1 + 2 * C.x
    0.024_390_243, // 1 / 41
);

#[inline]
fn mod289_2(x: Vec2) -> Vec2 {
    x - (x / 289.0).floor() * 289.0
}

#[inline]
fn mod289_3(x: Vec3) -> Vec3 {
    x - (x / 289.0).floor() * 289.0
}

#[inline]
fn permute(x: Vec3) -> Vec3 {
    mod289_3((x * 34.0 + 1.0) * x)
}

#[inline]
fn fract_gl(x: Vec3) -> Vec3 {
    x - x.floor()
}

impl Simplex {
    pub fn noise(v: Vec2) -> f32 {
        // Skew into simplex space and find the containing cell.
        let i = (v + Vec2::splat(v.dot(Vec2::splat(C.y)))).floor();
        let x0 = v - i + Vec2::splat(i.dot(Vec2::splat(C.x)));

        let i1 = if x0.x > x0.y { Vec2::X } else { Vec2::Y };
        let x1 = x0 + Vec2::splat(C.x) - i1;
        let x2 = x0 + Vec2::splat(C.z);

        let i = mod289_2(i);
        let p = permute(
            permute(Vec3::splat(i.y) + Vec3::new(0.0, i1.y, 1.0))
                + Vec3::splat(i.x)
                + Vec3::new(0.0, i1.x, 1.0),
        );

        let mut m = (Vec3::splat(0.5) - Vec3::new(x0.dot(x0), x1.dot(x1), x2.dot(x2)))
            .max(Vec3::ZERO);
        m *= m;
        m *= m;

        // Gradients: 41 points uniformly over a line, mapped onto a diamond.
        let x = 2.0 * fract_gl(p * C.w) - 1.0;
        let h = x.abs() - 0.5;
        let ox = (x + 0.5).floor();
        let a0 = x - ox;

        // Normalise gradients implicitly by scaling m.
        m *= Vec3::splat(1.792_842_9) - 0.853_734_7 * (a0 * a0 + h * h);

        let g = Vec3::new(
            a0.x * x0.x + h.x * x0.y,
            a0.y * x1.x + h.y * x1.y,
            a0.z * x2.x + h.z * x2.y,
        );
        130.0 * m.dot(g)
    }
}

impl NoiseField for Simplex {
    #[inline]
    fn sample(&self, p: Vec2) -> f32 {
        Simplex::noise(p)
    }
}

// ---------------------------------------------------------------------------
// SeededNoise: fastnoise-lite OpenSimplex2 with an explicit seed
// ---------------------------------------------------------------------------

/// OpenSimplex2 field with a caller-chosen seed.
///
/// CPU-only: the GPU path always uses [`Simplex`].
pub struct SeededNoise {
    seed: i32,
    inner: FastNoiseLite,
}

impl SeededNoise {
    pub fn new(seed: i32) -> Self {
        let mut inner = FastNoiseLite::with_seed(seed);
        inner.set_noise_type(Some(NoiseType::OpenSimplex2));
        inner.set_frequency(Some(1.0));
        Self { seed, inner }
    }

    pub fn seed(&self) -> i32 {
        self.seed
    }
}

impl NoiseField for SeededNoise {
    #[inline]
    fn sample(&self, p: Vec2) -> f32 {
        self.inner.get_noise_2d(p.x, p.y)
    }
}
