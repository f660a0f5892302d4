//! Building intersectable geometry from a scene description.

use crate::{HittableList, Lambertian, Material, Metal, Sphere};
use lumen_core::{scene, MaterialKind, Scene};
use std::sync::Arc;

/// Convert a material definition into a shared scatterer.
pub fn material_from_desc(desc: &scene::Material) -> Arc<dyn Material> {
    match desc.kind {
        MaterialKind::Lambertian => Arc::new(Lambertian::new(desc.albedo)),
        MaterialKind::Metal => Arc::new(Metal::new(desc.albedo)),
    }
}

/// Build the world for one frame.
///
/// Each arena material a sphere references becomes one `Arc`, so spheres
/// sharing a material in the scene share it here too. Unreferenced
/// materials are not converted.
pub fn build_world(scene: &Scene) -> HittableList {
    let descs = scene.materials();
    let mut materials: Vec<Option<Arc<dyn Material>>> = vec![None; descs.len()];

    let mut world = HittableList::new();
    for (index, sphere) in scene.spheres().iter().enumerate() {
        let material = match (materials.get_mut(sphere.material), descs.get(sphere.material)) {
            (Some(slot), Some(desc)) => Some(Arc::clone(slot.get_or_insert_with(|| material_from_desc(desc)))),
            _ => None,
        };
        match material {
            Some(material) => world.add(Box::new(Sphere::new(sphere.center, sphere.radius(), material))),
            None => log::warn!(
                "Sphere {} references missing material {}, skipping",
                index,
                sphere.material
            ),
        }
    }

    world
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Color, Hittable};
    use lumen_math::{Interval, Ray, Vec3};

    #[test]
    fn test_build_default_world() {
        let scene = Scene::default_scene();
        let world = build_world(&scene);
        assert_eq!(world.len(), 2);

        // Straight ahead hits the small blue sphere first
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let rec = world.hit(&ray, Interval::new(0.001, f32::INFINITY)).unwrap();
        assert_eq!(rec.material.albedo(), Color::new(0.1, 0.2, 0.5));
        assert!((rec.t - 0.7).abs() < 1e-4);
    }

    #[test]
    fn test_material_variants() {
        let metal = material_from_desc(&scene::Material::metal(Color::splat(0.3)));
        assert_eq!(metal.type_name(), "metal");
        assert_eq!(metal.albedo(), Color::splat(0.3));

        let diffuse = material_from_desc(&scene::Material::lambertian(Color::ONE));
        assert_eq!(diffuse.type_name(), "lambertian");
    }

    #[test]
    fn test_unreferenced_material_skipped() {
        let mut scene = Scene::new("unused");
        scene.add_material(scene::Material::metal(Color::ONE));
        let used = scene.add_material(scene::Material::lambertian(Color::splat(0.4)));
        scene.add_sphere(Vec3::new(0.0, 0.0, -2.0), 0.5, used).unwrap();

        let world = build_world(&scene);
        assert_eq!(world.len(), 1);
        let rec = world
            .hit(&Ray::new(Vec3::ZERO, Vec3::NEG_Z), Interval::new(0.001, f32::INFINITY))
            .unwrap();
        assert_eq!(rec.material.type_name(), "lambertian");
        assert_eq!(rec.material.albedo(), Color::splat(0.4));
    }

    #[test]
    fn test_shared_material_is_one_arc() {
        let mut scene = Scene::new("shared");
        let mat = scene.add_material(scene::Material::lambertian(Color::ONE));
        scene.add_sphere(Vec3::new(-1.0, 0.0, -3.0), 0.5, mat).unwrap();
        scene.add_sphere(Vec3::new(1.0, 0.0, -3.0), 0.5, mat).unwrap();

        let world = build_world(&scene);
        let left = world
            .hit(&Ray::new(Vec3::ZERO, Vec3::new(-1.0, 0.0, -3.0)), Interval::new(0.001, f32::INFINITY))
            .unwrap();
        let right = world
            .hit(&Ray::new(Vec3::ZERO, Vec3::new(1.0, 0.0, -3.0)), Interval::new(0.001, f32::INFINITY))
            .unwrap();

        assert!(std::ptr::addr_eq(left.material, right.material));
    }
}
