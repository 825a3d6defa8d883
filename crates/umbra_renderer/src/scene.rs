//! Scene arena: materials, primitives, instances and the instance BVH.
//!
//! A scene is assembled with a [`SceneBuilder`]. `build()` validates the
//! references between resources and constructs the BVH, producing an
//! immutable [`Scene`] that can be shared across render threads.

use crate::{
    Bvh, BvhSettings, Intersect, Material, Primitive, PrimitiveInstance, SceneError,
};
use umbra_math::{Aabb, Axis, Color, Ray};

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

arena_id!(
    /// Index of a material in a scene.
    MaterialId
);
arena_id!(
    /// Index of a primitive in a scene.
    PrimitiveId
);
arena_id!(
    /// Index of a primitive instance in a scene.
    InstanceId
);

/// Mutable scene under construction.
pub struct SceneBuilder {
    materials: Vec<Box<dyn Material>>,
    primitives: Vec<Box<dyn Primitive>>,
    instances: Vec<PrimitiveInstance>,
    background: Color,
}

impl SceneBuilder {
    pub fn new(background: Color) -> Self {
        Self {
            materials: Vec::new(),
            primitives: Vec::new(),
            instances: Vec::new(),
            background,
        }
    }

    pub fn add_material(&mut self, material: impl Material + 'static) -> MaterialId {
        self.materials.push(Box::new(material));
        MaterialId(self.materials.len() as u32 - 1)
    }

    pub fn add_primitive(&mut self, primitive: impl Primitive + 'static) -> PrimitiveId {
        self.primitives.push(Box::new(primitive));
        PrimitiveId(self.primitives.len() as u32 - 1)
    }

    /// Place a primitive in the world. Several instances may share one
    /// primitive.
    pub fn add_instance(&mut self, primitive: PrimitiveId, axis: Axis) -> InstanceId {
        let local_bounds = self
            .primitives
            .get(primitive.index())
            .map_or(Aabb::EMPTY, |p| p.bounds());
        self.instances
            .push(PrimitiveInstance::new(primitive, axis, local_bounds));
        InstanceId(self.instances.len() as u32 - 1)
    }

    /// Add a primitive with a single instance.
    pub fn add(&mut self, primitive: impl Primitive + 'static, axis: Axis) -> InstanceId {
        let id = self.add_primitive(primitive);
        self.add_instance(id, axis)
    }

    pub fn instance_mut(&mut self, id: InstanceId) -> Option<&mut PrimitiveInstance> {
        self.instances.get_mut(id.index())
    }

    pub fn set_background(&mut self, background: Color) {
        self.background = background;
    }

    /// Validate references and build the instance BVH.
    pub fn build(self, settings: &BvhSettings) -> Result<Scene, SceneError> {
        for (index, primitive) in self.primitives.iter().enumerate() {
            let material = primitive.material();
            if material.index() >= self.materials.len() {
                return Err(SceneError::UnknownMaterial {
                    primitive: index,
                    material,
                });
            }
        }
        for (index, instance) in self.instances.iter().enumerate() {
            if instance.primitive().index() >= self.primitives.len() {
                return Err(SceneError::UnknownPrimitive {
                    instance: index,
                    primitive: instance.primitive(),
                });
            }
        }

        let bounds: Vec<Aabb> = self.instances.iter().map(|i| i.bounds()).collect();
        let bvh = Bvh::build(&bounds, settings);

        log::info!(
            "Scene built: {} materials, {} primitives, {} instances",
            self.materials.len(),
            self.primitives.len(),
            self.instances.len()
        );
        log::info!(
            "Scene BVH: {} nodes, {} leaves, depth {}",
            bvh.node_count(),
            bvh.leaf_count(),
            bvh.depth()
        );

        Ok(Scene {
            materials: self.materials,
            primitives: self.primitives,
            instances: self.instances,
            bvh,
            background: self.background,
        })
    }
}

/// Immutable, thread-shareable scene.
pub struct Scene {
    materials: Vec<Box<dyn Material>>,
    primitives: Vec<Box<dyn Primitive>>,
    instances: Vec<PrimitiveInstance>,
    bvh: Bvh,
    background: Color,
}

impl Scene {
    #[inline]
    pub fn background(&self) -> Color {
        self.background
    }

    pub fn bounds(&self) -> Aabb {
        self.bvh.bounds()
    }

    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn instance(&self, id: InstanceId) -> Option<&PrimitiveInstance> {
        self.instances.get(id.index())
    }

    pub fn primitive(&self, id: PrimitiveId) -> &dyn Primitive {
        self.primitives[id.index()].as_ref()
    }

    pub fn material(&self, id: MaterialId) -> &dyn Material {
        self.materials[id.index()].as_ref()
    }

    /// Closest hit along `ray`, with only the cheap phase done.
    pub fn hit(&self, ray: &Ray) -> Option<Intersect<'_>> {
        let mut best: Option<Intersect<'_>> = None;

        self.bvh.hit(ray, |index, closest| {
            let instance = &self.instances[index];
            let mut candidate = Intersect::new(ray.with_max(closest));
            if instance.hit(self.primitive(instance.primitive()), &mut candidate)
                && candidate.t < closest
            {
                let t = candidate.t;
                best = Some(candidate);
                t
            } else {
                -1.0
            }
        });

        best.map(|mut hit| {
            hit.view_ray = *ray;
            hit
        })
    }

    /// Complete a hit returned by [`Scene::hit`]: world position, normal, UV.
    pub fn complete(&self, hit: &mut Intersect<'_>) {
        if let Some(instance) = hit.instance {
            instance.intersect(self.primitive(instance.primitive()), hit);
        }
    }

    /// Material of the primitive behind a hit.
    pub fn material_of(&self, hit: &Intersect<'_>) -> Option<&dyn Material> {
        let instance = hit.instance?;
        let primitive = self.primitive(instance.primitive());
        Some(self.material(primitive.material()))
    }

    /// Linear scan over every instance. Slow; used to check the BVH.
    pub fn hit_brute_force(&self, ray: &Ray) -> Option<Intersect<'_>> {
        let mut best: Option<Intersect<'_>> = None;
        for instance in &self.instances {
            let closest = best.map_or(ray.interval.max, |b| b.t);
            let mut candidate = Intersect::new(ray.with_max(closest));
            if instance.hit(self.primitive(instance.primitive()), &mut candidate)
                && candidate.t < closest
            {
                best = Some(candidate);
            }
        }
        best.map(|mut hit| {
            hit.view_ray = *ray;
            hit
        })
    }
}
