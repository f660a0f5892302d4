//! Sphere primitive for ray tracing.

use crate::{
    hittable::{HitRecord, Hittable},
    Material,
};
use lumen_math::{Interval, Ray, Vec3};
use std::sync::Arc;

/// A sphere primitive. The material may be shared with other spheres.
#[derive(Clone)]
pub struct Sphere {
    pub center: Vec3,
    radius: f32,
    material: Arc<dyn Material>,
}

impl Sphere {
    /// Create a new sphere. Negative radii are clamped to zero.
    pub fn new(center: Vec3, radius: f32, material: Arc<dyn Material>) -> Self {
        Self {
            center,
            radius: radius.max(0.0),
            material,
        }
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius.max(0.0);
    }

    pub fn material(&self) -> &Arc<dyn Material> {
        &self.material
    }

    pub fn set_material(&mut self, material: Arc<dyn Material>) {
        self.material = material;
    }
}

impl Hittable for Sphere {
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord<'_>> {
        // A zero direction would divide by zero below; a zero radius has no
        // usable normal.
        if ray.is_degenerate() || self.radius <= 0.0 {
            return None;
        }

        let oc = ray.origin() - self.center;
        let a = ray.direction().length_squared();
        let half_b = oc.dot(ray.direction());
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = half_b * half_b - a * c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrtd = discriminant.sqrt();

        // Find the nearest root in the acceptable range
        let mut root = (-half_b - sqrtd) / a;
        if !ray_t.contains(root) {
            root = (-half_b + sqrtd) / a;
            if !ray_t.contains(root) {
                return None;
            }
        }

        let outward_normal = (ray.at(root) - self.center) / self.radius;
        Some(HitRecord::new(ray, root, outward_normal, self.material.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{Lambertian, Metal};
    use crate::sampling::{gen_range, PcgHash};
    use crate::Color;

    fn grey_sphere(center: Vec3, radius: f32) -> Sphere {
        Sphere::new(center, radius, Arc::new(Lambertian::new(Color::splat(0.5))))
    }

    #[test]
    fn test_sphere_hit() {
        let sphere = grey_sphere(Vec3::new(0.0, 0.0, -1.0), 0.5);
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));

        let rec = sphere.hit(&ray, Interval::new(0.001, f32::INFINITY)).unwrap();
        assert!((rec.t - 0.5).abs() < 0.001); // Should hit at t=0.5
        assert!(rec.front_face);
        assert!((rec.normal - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_sphere_miss() {
        let sphere = grey_sphere(Vec3::new(0.0, 0.0, -1.0), 0.5);

        // Ray pointing away from sphere
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0));
        assert!(sphere.hit(&ray, Interval::new(0.001, f32::INFINITY)).is_none());
    }

    #[test]
    fn test_degenerate_inputs_miss() {
        let sphere = grey_sphere(Vec3::new(0.0, 0.0, -1.0), 0.5);
        let zero_dir = Ray::new(Vec3::ZERO, Vec3::ZERO);
        assert!(sphere.hit(&zero_dir, Interval::new(0.001, f32::INFINITY)).is_none());

        let point = grey_sphere(Vec3::new(0.0, 0.0, -1.0), -3.0);
        assert_eq!(point.radius(), 0.0);
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        assert!(point.hit(&ray, Interval::new(0.001, f32::INFINITY)).is_none());
    }

    #[test]
    fn test_normals_face_the_ray() {
        let mut rng = PcgHash::new(2024);

        for _ in 0..2000 {
            let center = Vec3::new(
                gen_range(&mut rng, -2.0, 2.0),
                gen_range(&mut rng, -2.0, 2.0),
                gen_range(&mut rng, -2.0, 2.0),
            );
            let sphere = grey_sphere(center, gen_range(&mut rng, 0.1, 3.0));
            let origin = Vec3::new(
                gen_range(&mut rng, -4.0, 4.0),
                gen_range(&mut rng, -4.0, 4.0),
                gen_range(&mut rng, -4.0, 4.0),
            );
            // Aim near the center so a good share of rays hit
            let direction = center - origin
                + Vec3::new(
                    gen_range(&mut rng, -1.0, 1.0),
                    gen_range(&mut rng, -1.0, 1.0),
                    gen_range(&mut rng, -1.0, 1.0),
                );
            let ray = Ray::new(origin, direction);

            if let Some(rec) = sphere.hit(&ray, Interval::new(0.001, f32::INFINITY)) {
                let outward = (rec.p - sphere.center) / sphere.radius();
                assert_eq!(rec.front_face, ray.direction().dot(outward) < 0.0);
                assert!(ray.direction().dot(rec.normal) <= 0.0);
                assert!(rec.t >= 0.001);
            }
        }
    }

    #[test]
    fn test_reassign_material() {
        let mut sphere = grey_sphere(Vec3::ZERO, 1.0);
        sphere.set_material(Arc::new(Metal::new(Color::splat(0.3))));
        sphere.set_radius(2.0);

        assert_eq!(sphere.material().type_name(), "metal");
        assert_eq!(sphere.radius(), 2.0);
    }
}
