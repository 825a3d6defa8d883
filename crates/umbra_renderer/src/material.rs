//! Material trait for surface scattering.

use crate::sampling::{random_in_unit_sphere, random_unit_vector, reflect, refract, schlick};
use crate::Intersect;
use rand::{Rng, RngCore};
use umbra_math::{Color, Ray, Vec3};

/// Result of scattering a ray at a surface.
#[derive(Debug, Clone, Copy)]
pub struct Scatter {
    /// Continuation ray, starting at the hit position
    pub ray: Ray,
    /// Weight applied to the light arriving along `ray`
    pub attenuation: Color,
    /// Light emitted towards the viewer
    pub emitted: Color,
}

impl Scatter {
    /// Path ends here; only `emitted` contributes.
    pub fn absorbed(emitted: Color) -> Self {
        Self {
            ray: Ray::default(),
            attenuation: Color::ZERO,
            emitted,
        }
    }

    pub fn reflected(ray: Ray, attenuation: Color) -> Self {
        Self {
            ray,
            attenuation,
            emitted: Color::ZERO,
        }
    }

    /// Nothing more to trace.
    pub fn is_terminal(&self) -> bool {
        self.attenuation.cmple(Color::ZERO).all()
    }
}

/// Trait for materials that describe how light interacts with surfaces.
///
/// `hit` is a completed intersection: world position, unit outward normal,
/// UV and the incoming view ray are all set.
pub trait Material: Send + Sync {
    fn scatter(&self, hit: &Intersect<'_>, rng: &mut dyn RngCore) -> Scatter;
}

/// Lambertian (diffuse) material.
#[derive(Debug, Clone)]
pub struct Diffuse {
    color: Color,
}

impl Diffuse {
    pub fn new(color: Color) -> Self {
        Self { color }
    }
}

/// Cosine-weighted direction about `normal`.
fn diffuse_direction(normal: Vec3, rng: &mut dyn RngCore) -> Vec3 {
    let direction = normal + random_unit_vector(rng);
    // Catch degenerate scatter direction
    if direction.length_squared() < 1e-8 {
        normal
    } else {
        direction
    }
}

impl Material for Diffuse {
    fn scatter(&self, hit: &Intersect<'_>, rng: &mut dyn RngCore) -> Scatter {
        let direction = diffuse_direction(hit.facing_normal(), rng);
        Scatter::reflected(Ray::new(hit.position, direction), self.color)
    }
}

/// Diffuse material alternating two colors in a UV checkerboard.
#[derive(Debug, Clone)]
pub struct Checkered {
    even: Color,
    odd: Color,
    /// Checks per unit of UV
    scale: f32,
}

impl Checkered {
    pub fn new(even: Color, odd: Color, scale: f32) -> Self {
        Self { even, odd, scale }
    }

    pub fn color_at(&self, u: f32, v: f32) -> Color {
        let cell = (u * self.scale).floor() as i64 + (v * self.scale).floor() as i64;
        if cell.rem_euclid(2) == 0 {
            self.even
        } else {
            self.odd
        }
    }
}

impl Material for Checkered {
    fn scatter(&self, hit: &Intersect<'_>, rng: &mut dyn RngCore) -> Scatter {
        let direction = diffuse_direction(hit.facing_normal(), rng);
        Scatter::reflected(
            Ray::new(hit.position, direction),
            self.color_at(hit.uv.x, hit.uv.y),
        )
    }
}

/// Escape iteration of `c = x + iy` under `z = z^2 + c`, or 0 when the orbit
/// stays bounded for `max_iterations`.
pub fn escape_time(x: f64, y: f64, max_iterations: u32) -> u32 {
    let (mut zx, mut zy) = (0.0f64, 0.0f64);
    for i in 0..max_iterations {
        let (xx, yy) = (zx * zx, zy * zy);
        if xx + yy >= 4.0 {
            return i;
        }
        zy = 2.0 * zx * zy + y;
        zx = xx - yy + x;
    }
    0
}

/// Mandelbrot set painted over UV, as a diffuse tint or as an emitter.
///
/// Each channel of `base` advances once per escape iteration and wraps to
/// [0, 1), giving repeating color bands around the set. Points inside the set
/// get `offset` only.
#[derive(Debug, Clone)]
pub struct Mandelbrot {
    base: Color,
    offset: Color,
    brightness: f32,
    center: (f64, f64),
    zoom: f64,
    max_iterations: u32,
    emissive: bool,
}

impl Mandelbrot {
    /// UV (0, 0) maps to `center`; one unit of UV spans `1 / zoom` of the plane.
    pub fn new(base: Color, center: (f64, f64), zoom: f64) -> Self {
        let zoom = if zoom > 0.0 { zoom } else { 1.0 };
        Self {
            base,
            offset: Color::ZERO,
            brightness: 1.0,
            center,
            zoom,
            max_iterations: (zoom * 50.0).min(f64::from(u32::MAX - 5)) as u32 + 5,
            emissive: false,
        }
    }

    pub fn with_brightness(mut self, brightness: f32, offset: Color) -> Self {
        self.brightness = brightness;
        self.offset = offset;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Emit the pattern instead of tinting diffuse bounces.
    pub fn emissive(mut self) -> Self {
        self.emissive = true;
        self
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn color_at(&self, u: f32, v: f32) -> Color {
        let x = self.center.0 + f64::from(u) / self.zoom;
        let y = self.center.1 + f64::from(v) / self.zoom;
        let bands = self.base * escape_time(x, y, self.max_iterations) as f32;
        (bands - bands.floor()) * self.brightness + self.offset
    }
}

impl Material for Mandelbrot {
    fn scatter(&self, hit: &Intersect<'_>, rng: &mut dyn RngCore) -> Scatter {
        let color = self.color_at(hit.uv.x, hit.uv.y);
        if self.emissive {
            let cosine = hit.normal.dot(hit.view_direction()).abs();
            return Scatter::absorbed(color * cosine);
        }

        let direction = diffuse_direction(hit.facing_normal(), rng);
        Scatter::reflected(
            Ray::new(hit.position, direction),
            color.clamp(Color::ZERO, Color::ONE),
        )
    }
}

/// Metal (specular) material.
#[derive(Debug, Clone)]
pub struct Metal {
    color: Color,
    fuzz: f32,
}

impl Metal {
    /// `fuzz`: roughness, 0.0 = perfect mirror, 1.0 = very rough
    pub fn new(color: Color, fuzz: f32) -> Self {
        Self {
            color,
            fuzz: fuzz.clamp(0.0, 1.0),
        }
    }
}

impl Material for Metal {
    fn scatter(&self, hit: &Intersect<'_>, rng: &mut dyn RngCore) -> Scatter {
        let facing = hit.facing_normal();
        let normal = (facing + self.fuzz * random_in_unit_sphere(rng)).normalize_or_zero();
        let direction = reflect(hit.view_direction(), normal);

        // Fuzz can push the reflection below the surface
        if direction.dot(facing) <= 0.0 {
            return Scatter::absorbed(Color::ZERO);
        }
        Scatter::reflected(Ray::new(hit.position, direction), self.color)
    }
}

/// Dielectric (glass) material.
#[derive(Debug, Clone)]
pub struct Glass {
    color: Color,
    /// Index of refraction (1.0 = air, 1.5 = glass, 2.4 = diamond)
    ior: f32,
    /// Normal perturbation, 0.0 = clear
    roughness: f32,
}

impl Glass {
    pub fn new(color: Color, ior: f32) -> Self {
        Self {
            color,
            ior,
            roughness: 0.0,
        }
    }

    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness.clamp(0.0, 1.0);
        self
    }
}

impl Material for Glass {
    fn scatter(&self, hit: &Intersect<'_>, rng: &mut dyn RngCore) -> Scatter {
        let unit_direction = hit.view_direction();
        let entering = unit_direction.dot(hit.normal) < 0.0;
        let eta = if entering { 1.0 / self.ior } else { self.ior };

        let mut normal = hit.facing_normal();
        if self.roughness > 0.0 {
            normal = (normal + self.roughness * random_in_unit_sphere(rng)).normalize_or_zero();
        }

        let cos_theta = (-unit_direction).dot(normal).clamp(0.0, 1.0);
        let direction = match refract(unit_direction, normal, eta) {
            Some(refracted) if schlick(cos_theta, eta) <= rng.gen::<f32>() => refracted,
            _ => reflect(unit_direction, normal),
        };

        Scatter::reflected(Ray::new(hit.position, direction), self.color)
    }
}

/// Emitter. Brightest when viewed head-on.
#[derive(Debug, Clone)]
pub struct Light {
    color: Color,
}

impl Light {
    pub fn new(color: Color) -> Self {
        Self { color }
    }
}

impl Material for Light {
    fn scatter(&self, hit: &Intersect<'_>, _rng: &mut dyn RngCore) -> Scatter {
        let cosine = hit.normal.dot(hit.view_direction()).abs();
        Scatter::absorbed(self.color * cosine)
    }
}

/// Debug material: shades the world normal.
#[derive(Debug, Clone, Default)]
pub struct NormalShade;

impl Material for NormalShade {
    fn scatter(&self, hit: &Intersect<'_>, _rng: &mut dyn RngCore) -> Scatter {
        Scatter::absorbed(hit.normal * 0.5 + 0.5)
    }
}

/// Debug material: brightness grows with the marching steps spent.
#[derive(Debug, Clone)]
pub struct MarchCost {
    /// Steps that map to full white
    pub max_steps: u32,
}

impl Material for MarchCost {
    fn scatter(&self, hit: &Intersect<'_>, _rng: &mut dyn RngCore) -> Scatter {
        let level = hit.march_steps as f32 / self.max_steps.max(1) as f32;
        Scatter::absorbed(Color::splat(level.min(1.0)))
    }
}

/// Debug material: blends two colors by fractal iteration count.
#[derive(Debug, Clone)]
pub struct IterationShade {
    pub low: Color,
    pub high: Color,
    pub max_iterations: u32,
}

impl Material for IterationShade {
    fn scatter(&self, hit: &Intersect<'_>, _rng: &mut dyn RngCore) -> Scatter {
        let s = (hit.iterations as f32 / self.max_iterations.max(1) as f32).min(1.0);
        Scatter::absorbed(self.low.lerp(self.high, s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Completed hit on the z = 0 plane with normal +Z, ray arriving along `dir`.
    fn plane_hit(dir: Vec3) -> Intersect<'static> {
        let mut hit = Intersect::new(Ray::new(-dir, dir));
        hit.t = 1.0;
        hit.position = Vec3::ZERO;
        hit.normal = Vec3::Z;
        hit
    }

    #[test]
    fn test_diffuse_scatters_above_surface() {
        let mut rng = StdRng::seed_from_u64(42);
        let material = Diffuse::new(Color::new(0.5, 0.6, 0.7));
        let hit = plane_hit(-Vec3::Z);

        for _ in 0..100 {
            let scatter = material.scatter(&hit, &mut rng);
            assert!(scatter.ray.direction.dot(Vec3::Z) >= 0.0);
            assert_eq!(scatter.attenuation, Color::new(0.5, 0.6, 0.7));
            assert_eq!(scatter.emitted, Color::ZERO);
        }
    }

    #[test]
    fn test_diffuse_uses_facing_normal_from_behind() {
        let mut rng = StdRng::seed_from_u64(42);
        let hit = plane_hit(Vec3::Z);
        let scatter = Diffuse::new(Color::ONE).scatter(&hit, &mut rng);

        assert!(scatter.ray.direction.dot(Vec3::Z) <= 0.0);
    }

    #[test]
    fn test_checkered_alternates() {
        let checker = Checkered::new(Color::ONE, Color::ZERO, 2.0);

        assert_eq!(checker.color_at(0.1, 0.1), Color::ONE);
        assert_eq!(checker.color_at(0.6, 0.1), Color::ZERO);
        assert_eq!(checker.color_at(0.6, 0.6), Color::ONE);
    }

    #[test]
    fn test_escape_time() {
        // Origin and -1 never escape
        assert_eq!(escape_time(0.0, 0.0, 100), 0);
        assert_eq!(escape_time(-1.0, 0.0, 100), 0);
        // c = 1: z goes 0, 1, 2 and |2|^2 reaches the bound
        assert_eq!(escape_time(1.0, 0.0, 100), 2);
        assert_eq!(escape_time(3.0, 0.0, 100), 1);
        assert_eq!(escape_time(1.0, 0.0, 2), 0);
    }

    #[test]
    fn test_mandelbrot_bands() {
        let base = Color::new(0.3, 0.6, 0.1);
        let fractal = Mandelbrot::new(base, (0.0, 0.0), 1.0);
        assert_eq!(fractal.max_iterations(), 55);

        // Inside the set: offset only
        assert_eq!(fractal.color_at(0.0, 0.0), Color::ZERO);
        // c = 1 escapes at 2, so green wraps from 1.2
        let outside = fractal.color_at(1.0, 0.0);
        assert!((outside - Color::new(0.6, 0.2, 0.2)).length() < 1e-5, "{outside}");

        let bright = Mandelbrot::new(Color::splat(0.5), (0.0, 0.0), 1.0)
            .with_brightness(2.0, Color::splat(0.1));
        assert!((bright.color_at(3.0, 0.0) - Color::splat(1.1)).length() < 1e-5);
        assert!((bright.color_at(1.0, 0.0) - Color::splat(0.1)).length() < 1e-5);
        assert!((bright.color_at(0.0, 0.0) - Color::splat(0.1)).length() < 1e-5);
    }

    #[test]
    fn test_mandelbrot_zoom_and_center() {
        let base = Color::new(0.003, 0.002, 0.0015);
        let fractal = Mandelbrot::new(base, (-0.7453, 0.1127), 180.0);
        assert_eq!(fractal.max_iterations(), 9005);

        let mut rng = StdRng::seed_from_u64(42);
        let samples: Vec<_> = (0..200)
            .map(|_| fractal.color_at(rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0)))
            .collect();
        let in_range = |c: &Color| c.cmpge(Color::ZERO).all() && c.cmplt(Color::ONE).all();
        assert!(samples.iter().all(in_range));
        assert!(samples.windows(2).any(|w| w[0] != w[1]), "pattern is flat");
    }

    #[test]
    fn test_mandelbrot_tint_and_emission() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut hit = plane_hit(-Vec3::Z);
        hit.uv = umbra_math::Vec2::new(1.0, 0.0);
        let fractal = Mandelbrot::new(Color::new(0.3, 0.6, 0.1), (0.0, 0.0), 1.0)
            .with_brightness(2.0, Color::ZERO);

        let tint = fractal.scatter(&hit, &mut rng);
        assert!(!tint.is_terminal());
        assert!(tint.ray.direction.dot(Vec3::Z) >= 0.0);
        // 2 * (0.6, 0.2, 0.2) clamped
        assert!((tint.attenuation - Color::new(1.0, 0.4, 0.4)).length() < 1e-5);

        let glow = fractal.emissive().scatter(&hit, &mut rng);
        assert!(glow.is_terminal());
        assert!((glow.emitted - Color::new(1.2, 0.4, 0.4)).length() < 1e-5);
    }

    #[test]
    fn test_metal_mirror_reflects() {
        let mut rng = StdRng::seed_from_u64(42);
        let dir = Vec3::new(1.0, 0.0, -1.0).normalize();
        let scatter = Metal::new(Color::ONE, 0.0).scatter(&plane_hit(dir), &mut rng);
        let expected = Vec3::new(1.0, 0.0, 1.0).normalize();

        assert!((scatter.ray.direction - expected).length() < 1e-5);
    }

    #[test]
    fn test_glass_total_internal_reflection() {
        let mut rng = StdRng::seed_from_u64(42);
        // Leaving the medium at a grazing angle
        let dir = Vec3::new(1.0, 0.0, 0.2).normalize();
        let glass = Glass::new(Color::ONE, 1.5);

        for _ in 0..20 {
            let scatter = glass.scatter(&plane_hit(dir), &mut rng);
            assert!(scatter.ray.direction.z < 0.0, "must reflect back inside");
        }
    }

    #[test]
    fn test_glass_mostly_refracts_head_on() {
        let mut rng = StdRng::seed_from_u64(42);
        let glass = Glass::new(Color::ONE, 1.5);
        let refracted = (0..200)
            .filter(|_| glass.scatter(&plane_hit(-Vec3::Z), &mut rng).ray.direction.z < 0.0)
            .count();

        assert!(refracted > 150, "only {refracted} of 200 refracted");
    }

    #[test]
    fn test_light_terminates_path() {
        let mut rng = StdRng::seed_from_u64(42);
        let scatter = Light::new(Color::splat(4.0)).scatter(&plane_hit(-Vec3::Z), &mut rng);

        assert!(scatter.is_terminal());
        assert!((scatter.emitted - Color::splat(4.0)).length() < 1e-5);

        let oblique = Vec3::new(1.0, 0.0, -1.0).normalize();
        let dimmer = Light::new(Color::splat(4.0)).scatter(&plane_hit(oblique), &mut rng);
        assert!(dimmer.emitted.x < 4.0);
    }

    #[test]
    fn test_debug_materials() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut hit = plane_hit(-Vec3::Z);
        hit.march_steps = 5;
        hit.iterations = 10;

        let normal = NormalShade.scatter(&hit, &mut rng);
        assert_eq!(normal.emitted, Color::new(0.5, 0.5, 1.0));

        let cost = MarchCost { max_steps: 10 }.scatter(&hit, &mut rng);
        assert!((cost.emitted.x - 0.5).abs() < 1e-6);

        let shade = IterationShade {
            low: Color::ZERO,
            high: Color::ONE,
            max_iterations: 20,
        }
        .scatter(&hit, &mut rng);
        assert!((shade.emitted.y - 0.5).abs() < 1e-6);
        assert!(shade.is_terminal());
    }
}
