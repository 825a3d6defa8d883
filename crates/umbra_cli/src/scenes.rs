//! Built-in demo scenes.

use anyhow::{Context, Result};
use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use umbra_math::{Axis, Color, Vec3};
use umbra_renderer::sdf::{Bubbles, Mandelbulb, SphereField, Swirl, Torus, WavySphere};
use std::f32::consts::{FRAC_PI_2, PI};
use umbra_renderer::{
    BvhSettings, Camera, Checkered, Cuboid, Diffuse, Disc, Fog, Glass, IterationShade, Light,
    Mandelbrot, MarchCost, MarchSettings, Marched, Mesh, Metal, NormalShade, Rectangle, Scene,
    SceneBuilder, SmokeBox, Sphere,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DemoScene {
    /// Analytic, meshed and marched primitives with every material
    Default,
    /// One glass and one metal sphere on a checkered floor
    GlassSphere,
    /// Three mandelbulbs with diffuse, march-cost and iteration shading
    BulbField,
    /// Mandelbulb, wavy sphere and bubbles over a mirror
    Blobs,
    /// Hundreds of small spheres
    ManySpheres,
    /// Colored spheres and tori in a bank of fog
    Fog,
    /// Walled box lit by a Mandelbrot panel
    FractalBox,
}

impl DemoScene {
    pub fn description(self) -> &'static str {
        match self {
            DemoScene::Default => "Analytic, meshed and marched primitives with every material",
            DemoScene::GlassSphere => "One glass and one metal sphere on a checkered floor",
            DemoScene::BulbField => {
                "Three mandelbulbs with diffuse, march-cost and iteration shading"
            }
            DemoScene::Blobs => "Mandelbulb, wavy sphere and bubbles over a mirror",
            DemoScene::ManySpheres => "Hundreds of small spheres",
            DemoScene::Fog => "Colored spheres and tori in a bank of fog",
            DemoScene::FractalBox => "Walled box lit by a Mandelbrot panel",
        }
    }

    pub fn camera(self) -> Camera {
        match self {
            DemoScene::Default => Camera::new(Vec3::new(0.0, 40.0, 120.0), Vec3::ZERO)
                .with_lens(0.2, 100.0),
            DemoScene::GlassSphere => {
                Camera::new(Vec3::new(0.0, 40.0, 100.0), Vec3::new(0.0, 20.0, 0.0))
                    .with_lens(1.4, 120.0)
            }
            DemoScene::BulbField => Camera::new(Vec3::new(0.0, 60.0, 100.0), Vec3::ZERO)
                .with_lens(0.1, 180.0),
            DemoScene::Blobs => {
                Camera::new(Vec3::new(0.0, 50.0, 220.0), Vec3::new(0.0, 5.0, 0.0))
                    .with_lens(0.01, 250.0)
            }
            DemoScene::ManySpheres => {
                Camera::new(Vec3::new(0.0, 80.0, 160.0), Vec3::new(0.0, 10.0, 0.0))
            }
            DemoScene::Fog => Camera::new(Vec3::new(0.0, 60.0, 150.0), Vec3::new(0.0, 40.0, 0.0))
                .with_lens(0.1, 180.0),
            DemoScene::FractalBox => {
                Camera::new(Vec3::new(0.0, 50.0, 120.0), Vec3::new(0.0, 50.0, 0.0))
                    .with_lens(0.1, 120.0)
            }
        }
    }

    pub fn build(self, settings: &BvhSettings, march: &MarchSettings) -> Result<Scene> {
        let builder = match self {
            DemoScene::Default => default_scene(march)?,
            DemoScene::GlassSphere => glass_sphere(),
            DemoScene::BulbField => bulb_field(march),
            DemoScene::Blobs => blobs(march),
            DemoScene::ManySpheres => many_spheres(),
            DemoScene::Fog => fog(march),
            DemoScene::FractalBox => fractal_box(),
        };
        builder
            .build(settings)
            .with_context(|| format!("Failed to build scene {self:?}"))
    }
}

const FLOOR_RADIUS: f32 = 500.0;
/// Checks across the floor's UV range, 25 units each
const FLOOR_CHECKS: f32 = 40.0;

fn floor_material(odd: Color) -> Checkered {
    Checkered::new(Color::new(0.8, 0.8, 0.1), odd, FLOOR_CHECKS)
}

fn checkered_floor(builder: &mut SceneBuilder, odd: Color) {
    let floor = builder.add_material(floor_material(odd));
    builder.add(Disc::new(FLOOR_RADIUS, floor), Axis::IDENTITY);
}

fn default_scene(march: &MarchSettings) -> Result<SceneBuilder> {
    let mut builder = SceneBuilder::new(Color::splat(0.1));
    checkered_floor(&mut builder, Color::new(0.8, 0.1, 0.1));

    let white = builder.add_material(Diffuse::new(Color::splat(0.9)));
    let light = builder.add_material(Light::new(Color::splat(50.0)));
    let check = builder.add_material(Checkered::new(
        Color::new(0.1, 0.1, 0.8),
        Color::new(0.1, 0.8, 0.8),
        8.0,
    ));
    let blue = builder.add_material(Diffuse::new(Color::new(0.2, 0.2, 0.6)));
    let mirror = builder.add_material(Metal::new(Color::splat(0.95), 0.01));
    let metal = builder.add_material(Metal::new(Color::splat(0.9), 0.1));
    let glass = builder.add_material(Glass::new(Color::splat(0.95), 1.8).with_roughness(0.01));
    let normals = builder.add_material(NormalShade);

    builder.add(Sphere::new(8.0, light), Axis::translation(Vec3::new(0.0, 100.0, 0.0)));
    builder.add(
        Cuboid::new(Vec3::new(20.0, 40.0, 20.0), mirror),
        Axis::euler_zyx(Vec3::new(20.0, 20.0, 0.0), Vec3::new(0.0, 0.8, 0.0), 1.0),
    );
    builder.add(
        Cuboid::cube(15.0, metal),
        Axis::euler_zyx(Vec3::new(-35.0, 7.5, 30.0), Vec3::new(0.0, -0.8, 0.0), 1.0),
    );
    builder.add(
        Marched::new(Torus { major: 1.0, minor: 0.45 }, Vec3::new(3.0, 1.0, 3.0), check)
            .with_settings(*march),
        Axis::euler_zyx(Vec3::new(-20.0, 20.0, 0.0), Vec3::new(0.0, 0.0, 1.2), 12.0),
    );
    builder.add(Sphere::new(15.0, blue), Axis::translation(Vec3::new(0.0, 15.0, -40.0)));
    builder.add(Sphere::new(15.0, glass), Axis::translation(Vec3::new(0.0, 17.0, 25.0)));
    builder.add(
        Mesh::uv_sphere(10.0, 24, 16, white).context("Failed to tessellate mesh sphere")?,
        Axis::translation(Vec3::new(-20.0, 10.0, 40.0)),
    );
    builder.add(Sphere::new(10.0, normals), Axis::translation(Vec3::new(20.0, 10.0, 40.0)));
    builder.add(
        Marched::new(
            Swirl {
                radius: 1.0,
                wave_height: 0.05,
            },
            Vec3::splat(2.4),
            white,
        )
        .with_settings(march.with_step_scale(0.5)),
        Axis::euler_zyx(Vec3::new(60.0, 20.0, 0.0), Vec3::new(0.0, 1.4, 0.0), 20.0),
    );
    builder.add(Sphere::new(2.0, light), Axis::translation(Vec3::new(30.0, 30.0, 100.0)));

    Ok(builder)
}

fn glass_sphere() -> SceneBuilder {
    let mut builder = SceneBuilder::new(Color::splat(0.1));
    checkered_floor(&mut builder, Color::new(0.8, 0.1, 0.1));

    let light = builder.add_material(Light::new(Color::splat(70.0)));
    let glass = builder.add_material(Glass::new(Color::splat(0.95), 1.8).with_roughness(0.01));
    let metal = builder.add_material(Metal::new(Color::splat(0.5), 0.05));

    builder.add(Sphere::new(20.0, light), Axis::translation(Vec3::new(0.0, 100.0, 0.0)));
    builder.add(Sphere::new(20.0, glass), Axis::translation(Vec3::new(-30.0, 20.0, 0.0)));
    builder.add(Sphere::new(20.0, metal), Axis::translation(Vec3::new(30.0, 20.0, 0.0)));
    builder
}

fn bulb_field(march: &MarchSettings) -> SceneBuilder {
    let mut builder = SceneBuilder::new(Color::splat(0.2));
    checkered_floor(&mut builder, Color::new(0.8, 0.1, 0.1));

    let light = builder.add_material(Light::new(Color::splat(50.0)));
    let white = builder.add_material(Diffuse::new(Color::splat(0.9)));
    let cost = builder.add_material(MarchCost { max_steps: 100 });
    let bulb = Mandelbulb::default();
    let glow = builder.add_material(IterationShade {
        low: Color::new(0.1, 0.1, 0.4),
        high: Color::new(1.0, 0.8, 0.3),
        max_iterations: 12,
    });

    builder.add(Sphere::new(10.0, light), Axis::translation(Vec3::new(0.0, 100.0, 0.0)));
    let bounds = Vec3::splat(2.5);
    for (origin, material) in [
        (Vec3::new(0.0, 15.0, 0.0), white),
        (Vec3::new(-30.0, 15.0, 0.0), cost),
        (Vec3::new(0.0, 15.0, 40.0), glow),
    ] {
        builder.add(
            Marched::new(bulb, bounds, material).with_settings(*march),
            Axis::IDENTITY.with_origin(origin).with_scale(15.0),
        );
    }
    builder
}

fn blobs(march: &MarchSettings) -> SceneBuilder {
    let mut builder = SceneBuilder::new(Color::splat(0.1));
    checkered_floor(&mut builder, Color::new(1.0, 0.4, 0.2));

    let glass = builder.add_material(Glass::new(Color::splat(0.95), 1.8).with_roughness(0.01));
    let mirror = builder.add_material(Metal::new(Color::splat(0.8), 0.02));
    let cost = builder.add_material(MarchCost { max_steps: 100 });
    let light = builder.add_material(Light::new(Color::splat(60.0)));

    builder.add(
        Rectangle::new(200.0, 200.0, mirror),
        Axis::translation(Vec3::new(0.0, 1.0, 0.0)),
    );
    builder.add(Sphere::new(20.0, light), Axis::translation(Vec3::new(0.0, 200.0, 100.0)));

    let turn = Vec3::new(0.0, 1.0, 0.0);
    builder.add(
        Marched::new(Mandelbulb::default(), Vec3::splat(2.5), cost).with_settings(*march),
        Axis::euler_zyx(Vec3::new(-50.0, 45.0, 50.0), turn, 40.0),
    );
    builder.add(
        Marched::new(
            WavySphere {
                radius: 1.0,
                amplitude: 0.1,
            },
            Vec3::splat(2.4),
            glass,
        )
        .with_settings(march.with_step_scale(0.5)),
        Axis::euler_zyx(Vec3::new(50.0, 45.0, 50.0), turn, 40.0),
    );
    builder.add(
        Marched::new(Bubbles::helix(2.0, 0.0), Vec3::splat(3.0), glass).with_settings(*march),
        Axis::euler_zyx(Vec3::new(0.0, 45.0, -50.0), turn, 20.0),
    );
    builder.add(
        Marched::new(SphereField { radius: 1.0 }, Vec3::splat(2.0), mirror).with_settings(*march),
        Axis::translation(Vec3::new(0.0, 10.0, 60.0)).with_scale(10.0),
    );
    builder
}

fn many_spheres() -> SceneBuilder {
    let mut builder = SceneBuilder::new(Color::new(0.5, 0.7, 1.0));
    checkered_floor(&mut builder, Color::new(0.8, 0.1, 0.1));

    let mut rng = StdRng::seed_from_u64(7);
    let palette: Vec<_> = (0..8)
        .map(|_| {
            let color = Color::new(rng.gen(), rng.gen(), rng.gen());
            if rng.gen_bool(0.3) {
                builder.add_material(Metal::new(color, rng.gen_range(0.0..0.3)))
            } else {
                builder.add_material(Diffuse::new(color))
            }
        })
        .collect();

    let sphere = builder.add_primitive(Sphere::new(3.0, palette[0]));
    for x in -10..10 {
        for z in -10..10 {
            let jitter = Vec3::new(rng.gen_range(-2.0..2.0), 0.0, rng.gen_range(-2.0..2.0));
            let origin = Vec3::new(x as f32 * 8.0, 3.0, z as f32 * 8.0) + jitter;
            let material = palette[rng.gen_range(0..palette.len())];
            builder.add(Sphere::new(3.0, material), Axis::translation(origin));
        }
    }
    // One shared primitive reused by a ring of instances
    for i in 0..12 {
        let angle = i as f32 / 12.0 * std::f32::consts::TAU;
        let origin = Vec3::new(angle.cos() * 30.0, 25.0, angle.sin() * 30.0);
        builder.add_instance(sphere, Axis::translation(origin));
    }
    builder
}

fn fog(march: &MarchSettings) -> SceneBuilder {
    let mut builder = SceneBuilder::new(Color::new(0.1, 0.1, 0.15));
    let floor = builder.add_material(Checkered::new(Color::splat(0.8), Color::splat(0.4), 20.0));
    let check = builder.add_material(Checkered::new(Color::splat(0.8), Color::splat(0.4), 8.0));
    let light = builder.add_material(Light::new(Color::splat(100.0)));
    let haze = builder.add_material(Fog::new(Color::new(0.9, 0.7, 0.3)));

    builder.add(Disc::new(FLOOR_RADIUS, floor), Axis::IDENTITY);
    builder.add(Sphere::new(10.0, light), Axis::translation(Vec3::new(0.0, 80.0, 0.0)));
    for y in [75.0, 85.0] {
        builder.add(
            Marched::new(Torus { major: 1.0, minor: 0.45 }, Vec3::new(3.0, 1.0, 3.0), check)
                .with_settings(*march),
            Axis::translation(Vec3::new(0.0, y, 0.0)).with_scale(15.0),
        );
    }
    builder.add(
        SmokeBox::new(Vec3::new(400.0, 100.0, 400.0), 0.003, haze),
        Axis::translation(Vec3::new(0.0, 50.0, 0.0)),
    );
    for (x, color) in [
        (-70.0, Color::new(0.95, 0.0, 0.0)),
        (0.0, Color::new(0.0, 0.95, 0.0)),
        (70.0, Color::new(0.0, 0.0, 0.95)),
    ] {
        let material = builder.add_material(Diffuse::new(color));
        builder.add(Sphere::new(15.0, material), Axis::translation(Vec3::new(x, 15.0, 0.0)));
    }
    builder
}

fn fractal_box() -> SceneBuilder {
    let mut builder = SceneBuilder::new(Color::ZERO);
    let grey = builder.add_material(Diffuse::new(Color::splat(0.7)));
    let check = builder.add_material(Checkered::new(Color::splat(0.3), Color::splat(0.9), 4.0));
    let red = builder.add_material(Diffuse::new(Color::new(0.8, 0.1, 0.1)));
    let green = builder.add_material(Diffuse::new(Color::new(0.1, 0.8, 0.1)));
    let metal = builder.add_material(Metal::new(Color::splat(0.9), 0.07));
    let panel = builder.add_material(
        Mandelbrot::new(Color::new(0.003, 0.002, 0.0015), (-0.7453, 0.1127), 180.0)
            .with_brightness(1.5, Color::splat(0.1))
            .emissive(),
    );

    // Disc normals are local +Y
    let wall = |origin: Vec3, rotation: Vec3| Axis::euler_zyx(origin, rotation, 1.0);
    builder.add(Disc::new(100.0, check), Axis::IDENTITY);
    builder.add(Disc::new(100.0, grey), wall(Vec3::new(0.0, 50.0, -50.0), Vec3::X * FRAC_PI_2));
    builder.add(Disc::new(100.0, grey), wall(Vec3::new(0.0, 100.0, 0.0), Vec3::X * PI));
    builder.add(Disc::new(100.0, green), wall(Vec3::new(-50.0, 50.0, 0.0), -Vec3::Z * FRAC_PI_2));
    builder.add(Disc::new(100.0, red), wall(Vec3::new(50.0, 50.0, 0.0), Vec3::Z * FRAC_PI_2));

    for (origin, turn) in [
        (Vec3::new(18.0, 32.0, -15.0), 0.5),
        (Vec3::new(-20.0, 32.0, 10.0), -0.5),
    ] {
        let pillar = Cuboid::new(Vec3::new(25.0, 60.0, 25.0), metal);
        builder.add(pillar, wall(origin, Vec3::Y * turn));
    }
    builder.add(
        Rectangle::new(80.0, 80.0, panel),
        wall(Vec3::new(49.0, 50.0, 0.0), Vec3::Z * FRAC_PI_2),
    );
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_math::Ray;
    use umbra_renderer::Material;

    #[test]
    fn test_every_demo_scene_builds() {
        for scene in DemoScene::value_variants() {
            let built = scene
                .build(&BvhSettings::default(), &MarchSettings::default())
                .expect("demo scene builds");
            assert!(built.instance_count() > 0, "{scene:?} is empty");
            assert!(!scene.description().is_empty());
        }
    }

    #[test]
    fn test_camera_sees_floor() {
        let scene = DemoScene::GlassSphere
            .build(&BvhSettings::default(), &MarchSettings::default())
            .expect("demo scene builds");

        let ray = Ray::primary(Vec3::new(0.0, 40.0, 100.0), -Vec3::Y);
        let hit = scene.hit(&ray).expect("floor below the camera");
        assert!((hit.t - 40.0).abs() < 1e-3);
    }

    #[test]
    fn test_floor_checks_are_visible() {
        let floor = floor_material(Color::new(0.8, 0.1, 0.1));
        let mut even = 0;
        let mut odd = 0;
        for i in 0..=100 {
            for j in 0..=100 {
                if floor.color_at(i as f32 / 100.0, j as f32 / 100.0) == Color::new(0.8, 0.1, 0.1) {
                    odd += 1;
                } else {
                    even += 1;
                }
            }
        }
        assert!(even > 1000 && odd > 1000, "{even} even and {odd} odd samples");
    }

    #[test]
    fn test_floor_alternates_under_the_camera() {
        let scene = DemoScene::GlassSphere
            .build(&BvhSettings::default(), &MarchSettings::default())
            .expect("demo scene builds");
        let mut rng = StdRng::seed_from_u64(42);

        // Sample a line across the floor, well behind the spheres
        let mut colors = Vec::new();
        for step in 0..40 {
            let x = -100.0 + step as f32 * 5.0;
            let mut hit = scene
                .hit(&Ray::new(Vec3::new(x, 1.0, -150.0), -Vec3::Y))
                .expect("floor hit");
            scene.complete(&mut hit);
            let material = scene.material_of(&hit).expect("floor material");
            let color = material.scatter(&hit, &mut rng).attenuation;
            if !colors.contains(&color) {
                colors.push(color);
            }
        }
        assert_eq!(colors.len(), 2, "{colors:?}");
    }

    #[test]
    fn test_fog_scene_has_a_medium() {
        let scene = DemoScene::Fog
            .build(&BvhSettings::default(), &MarchSettings::default())
            .expect("demo scene builds");

        // Looking straight up through 100 units of fog from the floor
        let mut scattered = 0;
        for i in 0..200 {
            let origin = Vec3::new(-150.0 + i as f32 * 0.5, 0.5, 120.0);
            let hit = scene.hit(&Ray::new(origin, Vec3::Y));
            if hit.is_some_and(|h| h.t < 99.0) {
                scattered += 1;
            }
        }
        // Transmittance through 99.5 units at density 0.003 is about 0.74
        assert!((20..90).contains(&scattered), "{scattered} of 200 scattered");
    }

    #[test]
    fn test_fractal_box_panel_glows() {
        let scene = DemoScene::FractalBox
            .build(&BvhSettings::default(), &MarchSettings::default())
            .expect("demo scene builds");
        let mut rng = StdRng::seed_from_u64(42);

        let mut hit = scene
            .hit(&Ray::new(Vec3::new(0.0, 50.0, 30.0), Vec3::X))
            .expect("panel on the right wall");
        scene.complete(&mut hit);
        assert!((hit.t - 49.0).abs() < 1e-3, "t = {}", hit.t);

        let scatter = scene
            .material_of(&hit)
            .expect("panel material")
            .scatter(&hit, &mut rng);
        assert!(scatter.is_terminal());
        assert!(scatter.emitted.cmpge(Color::splat(0.1)).all());
    }
}
