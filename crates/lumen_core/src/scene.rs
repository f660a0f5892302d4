//! Scene description types for Lumen.
//!
//! Materials live in an arena owned by the `Scene`; spheres refer to them by
//! index, so several spheres may share one material and recoloring it affects
//! all of them. Sphere edits release materials no sphere uses any more, so
//! the arena stays proportional to the scene rather than to its edit history.

use lumen_math::{Color, Vec3};
use serde::Serialize;
use thiserror::Error;

/// Errors raised by scene edits.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("Sphere index {index} out of range (scene has {len} spheres)")]
    SphereIndex { index: usize, len: usize },

    #[error("Material index {index} out of range (scene has {len} materials)")]
    MaterialIndex { index: usize, len: usize },

    #[error("Scene has no spheres")]
    NoSpheres,
}

pub type SceneResult<T> = Result<T, SceneError>;

/// Scattering variant of a material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialKind {
    /// Diffuse reflection.
    Lambertian,
    /// Perfect mirror reflection.
    Metal,
}

impl MaterialKind {
    /// Human-readable tag shown by the inspection panel.
    pub fn type_name(&self) -> &'static str {
        match self {
            MaterialKind::Lambertian => "lambertian",
            MaterialKind::Metal => "metal",
        }
    }
}

/// Albedo given to a material created by swapping a sphere's variant.
pub const REASSIGNED_ALBEDO: Color = Color::new(0.3, 0.3, 0.3);

/// Albedo given to the material of a newly added sphere.
pub const DEFAULT_ALBEDO: Color = Color::new(0.5, 0.5, 0.5);

/// A material definition: variant plus albedo.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub kind: MaterialKind,

    /// Per-channel attenuation, expected in [0, 1] but not enforced
    pub albedo: Color,
}

impl Material {
    pub fn lambertian(albedo: Color) -> Self {
        Self {
            kind: MaterialKind::Lambertian,
            albedo,
        }
    }

    pub fn metal(albedo: Color) -> Self {
        Self {
            kind: MaterialKind::Metal,
            albedo,
        }
    }
}

/// A sphere placed in the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SphereInstance {
    pub center: Vec3,
    radius: f32,
    /// Index into the scene's material arena
    pub material: usize,
}

impl SphereInstance {
    /// Create a sphere. Negative radii are clamped to zero.
    pub fn new(center: Vec3, radius: f32, material: usize) -> Self {
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
}

/// Read-only snapshot of one sphere for the inspection panel.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SphereInfo {
    pub index: usize,
    pub center: [f32; 3],
    pub radius: f32,
    pub material: MaterialKind,
    pub albedo: [f32; 3],
    pub controlled: bool,
}

/// A complete scene: material arena, spheres, and the input-controlled sphere.
#[derive(Clone, Debug)]
pub struct Scene {
    /// Scene name (shown in logs)
    pub name: String,

    materials: Vec<Material>,

    spheres: Vec<SphereInstance>,

    /// Index of the sphere moved by keyboard input
    controlled: Option<usize>,

    /// Round-robin cursor for `toggle_controlled`
    toggle_cursor: usize,
}

impl Scene {
    /// Create an empty scene.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            materials: Vec::new(),
            spheres: Vec::new(),
            controlled: None,
            toggle_cursor: 1,
        }
    }

    /// The start-up scene: a large yellowish ground sphere and a small blue
    /// sphere in front of the camera, which starts out controlled.
    pub fn default_scene() -> Self {
        let mut scene = Scene::new("default");

        let ground = scene.add_material(Material::lambertian(Color::new(0.8, 0.8, 0.0)));
        let center = scene.add_material(Material::lambertian(Color::new(0.1, 0.2, 0.5)));

        scene.spheres.push(SphereInstance::new(Vec3::new(0.0, -100.5, -1.0), 100.0, ground));
        scene.spheres.push(SphereInstance::new(Vec3::new(0.0, 0.0, -1.2), 0.5, center));
        scene.controlled = Some(1);

        scene
    }

    /// Add a material to the arena and return its ID.
    pub fn add_material(&mut self, material: Material) -> usize {
        let id = self.materials.len();
        self.materials.push(material);
        id
    }

    /// Get a material by ID.
    pub fn material(&self, id: usize) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Get material count.
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// Set a material's albedo. Every sphere sharing it changes color.
    pub fn set_albedo(&mut self, material: usize, albedo: Color) -> SceneResult<()> {
        let len = self.materials.len();
        let slot = self
            .materials
            .get_mut(material)
            .ok_or(SceneError::MaterialIndex { index: material, len })?;
        slot.albedo = albedo;
        Ok(())
    }

    /// Add a sphere referencing an existing material and return its index.
    pub fn add_sphere(&mut self, center: Vec3, radius: f32, material: usize) -> SceneResult<usize> {
        if material >= self.materials.len() {
            return Err(SceneError::MaterialIndex {
                index: material,
                len: self.materials.len(),
            });
        }
        self.spheres.push(SphereInstance::new(center, radius, material));
        Ok(self.spheres.len() - 1)
    }

    /// Add a sphere in front of the camera with its own grey Lambertian.
    pub fn add_default_sphere(&mut self) -> usize {
        let material = self.add_material(Material::lambertian(DEFAULT_ALBEDO));
        self.spheres
            .push(SphereInstance::new(Vec3::new(0.0, 0.0, -1.2), 0.5, material));
        log::debug!("Added sphere {} to scene '{}'", self.spheres.len() - 1, self.name);
        self.spheres.len() - 1
    }

    /// Remove a sphere by index.
    ///
    /// The controlled cursor follows the remaining spheres; removing the
    /// controlled sphere leaves nothing controlled. If no other sphere used
    /// the removed sphere's material it is dropped from the arena, which
    /// shifts the IDs of later materials down by one.
    pub fn remove_sphere(&mut self, index: usize) -> SceneResult<SphereInstance> {
        self.check_sphere(index)?;
        let removed = self.spheres.remove(index);
        self.release_material(removed.material);

        self.controlled = match self.controlled {
            Some(c) if c == index => None,
            Some(c) if c > index => Some(c - 1),
            other => other,
        };

        log::debug!("Removed sphere {} from scene '{}'", index, self.name);
        Ok(removed)
    }

    /// Give a sphere a fresh material of the requested variant.
    ///
    /// The result is not shared with any other sphere. A material only this
    /// sphere uses is rewritten in place; a shared one is left to the other
    /// spheres and a new material is added.
    pub fn set_sphere_material(&mut self, index: usize, kind: MaterialKind) -> SceneResult<()> {
        self.check_sphere(index)?;
        let fresh = Material {
            kind,
            albedo: REASSIGNED_ALBEDO,
        };

        let current = self.spheres[index].material;
        let shared = self.spheres.iter().filter(|s| s.material == current).count() > 1;
        if !shared {
            if let Some(slot) = self.materials.get_mut(current) {
                *slot = fresh;
                return Ok(());
            }
        }

        let material = self.add_material(fresh);
        self.spheres[index].material = material;
        Ok(())
    }

    /// Set the albedo of the material a sphere currently uses.
    pub fn set_sphere_albedo(&mut self, index: usize, albedo: Color) -> SceneResult<()> {
        self.check_sphere(index)?;
        let material = self.spheres[index].material;
        self.set_albedo(material, albedo)
    }

    pub fn sphere(&self, index: usize) -> Option<&SphereInstance> {
        self.spheres.get(index)
    }

    pub fn sphere_mut(&mut self, index: usize) -> Option<&mut SphereInstance> {
        self.spheres.get_mut(index)
    }

    pub fn spheres(&self) -> &[SphereInstance] {
        &self.spheres
    }

    pub fn sphere_count(&self) -> usize {
        self.spheres.len()
    }

    /// Enumerate spheres with their resolved material for display.
    pub fn sphere_infos(&self) -> Vec<SphereInfo> {
        self.spheres
            .iter()
            .enumerate()
            .filter_map(|(index, sphere)| {
                let material = self.materials.get(sphere.material)?;
                Some(SphereInfo {
                    index,
                    center: sphere.center.to_array(),
                    radius: sphere.radius,
                    material: material.kind,
                    albedo: material.albedo.to_array(),
                    controlled: self.controlled == Some(index),
                })
            })
            .collect()
    }

    /// Index of the sphere driven by input, if any.
    pub fn controlled(&self) -> Option<usize> {
        self.controlled
    }

    /// Advance the controlled sphere round-robin over the list.
    pub fn toggle_controlled(&mut self) -> SceneResult<usize> {
        if self.spheres.is_empty() {
            return Err(SceneError::NoSpheres);
        }
        let index = self.toggle_cursor % self.spheres.len();
        self.toggle_cursor = self.toggle_cursor.wrapping_add(1);
        self.controlled = Some(index);
        Ok(index)
    }

    /// Move the controlled sphere. Returns false if nothing is controlled.
    pub fn translate_controlled(&mut self, delta: Vec3) -> bool {
        match self.controlled.and_then(|i| self.spheres.get_mut(i)) {
            Some(sphere) => {
                sphere.center += delta;
                true
            }
            None => false,
        }
    }

    /// Drop `material` from the arena if no sphere references it, remapping
    /// the indices of spheres that refer to later materials.
    fn release_material(&mut self, material: usize) {
        if material >= self.materials.len() || self.spheres.iter().any(|s| s.material == material) {
            return;
        }
        self.materials.remove(material);
        for sphere in &mut self.spheres {
            if sphere.material > material {
                sphere.material -= 1;
            }
        }
    }

    fn check_sphere(&self, index: usize) -> SceneResult<()> {
        if index < self.spheres.len() {
            Ok(())
        } else {
            Err(SceneError::SphereIndex {
                index,
                len: self.spheres.len(),
            })
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Scene::new("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scene() {
        let scene = Scene::default_scene();

        assert_eq!(scene.sphere_count(), 2);
        assert_eq!(scene.material_count(), 2);
        assert_eq!(scene.controlled(), Some(1));

        let ground = scene.sphere(0).unwrap();
        assert_eq!(ground.center, Vec3::new(0.0, -100.5, -1.0));
        assert_eq!(ground.radius(), 100.0);
    }

    #[test]
    fn test_radius_clamped() {
        let mut sphere = SphereInstance::new(Vec3::ZERO, -2.0, 0);
        assert_eq!(sphere.radius(), 0.0);

        sphere.set_radius(-1.0);
        assert_eq!(sphere.radius(), 0.0);
        sphere.set_radius(1.5);
        assert_eq!(sphere.radius(), 1.5);
    }

    #[test]
    fn test_shared_material_recolor() {
        let mut scene = Scene::new("shared");
        let mat = scene.add_material(Material::lambertian(Color::ONE));
        scene.add_sphere(Vec3::ZERO, 1.0, mat).unwrap();
        scene.add_sphere(Vec3::X, 1.0, mat).unwrap();

        scene.set_sphere_albedo(0, Color::new(0.2, 0.4, 0.6)).unwrap();

        let infos = scene.sphere_infos();
        assert_eq!(infos[0].albedo, [0.2, 0.4, 0.6]);
        assert_eq!(infos[1].albedo, [0.2, 0.4, 0.6]);
    }

    #[test]
    fn test_add_sphere_bad_material() {
        let mut scene = Scene::new("empty");
        let err = scene.add_sphere(Vec3::ZERO, 1.0, 3).unwrap_err();
        assert_eq!(err, SceneError::MaterialIndex { index: 3, len: 0 });
    }

    #[test]
    fn test_add_default_sphere() {
        let mut scene = Scene::default_scene();
        let index = scene.add_default_sphere();

        assert_eq!(index, 2);
        let info = &scene.sphere_infos()[index];
        assert_eq!(info.material, MaterialKind::Lambertian);
        assert_eq!(info.albedo, DEFAULT_ALBEDO.to_array());
        assert_eq!(info.center, [0.0, 0.0, -1.2]);
    }

    #[test]
    fn test_reassign_material_variant() {
        let mut scene = Scene::default_scene();
        scene.set_sphere_material(1, MaterialKind::Metal).unwrap();

        let info = &scene.sphere_infos()[1];
        assert_eq!(info.material, MaterialKind::Metal);
        assert_eq!(info.albedo, REASSIGNED_ALBEDO.to_array());

        // The ground keeps its own material
        assert_eq!(scene.sphere_infos()[0].material, MaterialKind::Lambertian);
        assert!(scene.set_sphere_material(9, MaterialKind::Metal).is_err());
    }

    #[test]
    fn test_remove_sphere_moves_controlled() {
        let mut scene = Scene::default_scene();
        scene.add_default_sphere();
        scene.toggle_controlled().unwrap(); // cursor 1 -> sphere 1
        scene.toggle_controlled().unwrap(); // cursor 2 -> sphere 2
        assert_eq!(scene.controlled(), Some(2));

        scene.remove_sphere(0).unwrap();
        assert_eq!(scene.controlled(), Some(1));

        scene.remove_sphere(1).unwrap();
        assert_eq!(scene.controlled(), None);
        assert!(!scene.translate_controlled(Vec3::X));

        assert_eq!(
            scene.remove_sphere(5),
            Err(SceneError::SphereIndex { index: 5, len: 1 })
        );
    }

    #[test]
    fn test_toggle_controlled_round_robin() {
        let mut scene = Scene::default_scene();
        scene.add_default_sphere();

        let order: Vec<usize> = (0..4).map(|_| scene.toggle_controlled().unwrap()).collect();
        assert_eq!(order, vec![1, 2, 0, 1]);

        let mut empty = Scene::new("empty");
        assert_eq!(empty.toggle_controlled(), Err(SceneError::NoSpheres));
    }

    #[test]
    fn test_translate_controlled() {
        let mut scene = Scene::default_scene();
        assert!(scene.translate_controlled(Vec3::new(0.5, 0.0, -0.25)));
        assert_eq!(scene.sphere(1).unwrap().center, Vec3::new(0.5, 0.0, -1.45));
    }

    #[test]
    fn test_material_arena_stays_bounded() {
        let mut scene = Scene::default_scene();
        for i in 0..1000 {
            let kind = if i % 2 == 0 {
                MaterialKind::Metal
            } else {
                MaterialKind::Lambertian
            };
            scene.set_sphere_material(1, kind).unwrap();
        }
        assert_eq!(scene.material_count(), 2);
        assert_eq!(scene.sphere_infos()[1].material, MaterialKind::Lambertian);

        scene.remove_sphere(1).unwrap();
        assert_eq!(scene.sphere_count(), 1);
        assert_eq!(scene.material_count(), 1);

        // Add and remove churn returns to the same size
        for _ in 0..100 {
            let index = scene.add_default_sphere();
            scene.remove_sphere(index).unwrap();
        }
        assert_eq!(scene.material_count(), 1);
    }

    #[test]
    fn test_reassign_shared_material() {
        let mut scene = Scene::new("shared");
        let red = scene.add_material(Material::lambertian(Color::X));
        let blue = scene.add_material(Material::lambertian(Color::Z));
        scene.add_sphere(Vec3::ZERO, 1.0, red).unwrap();
        scene.add_sphere(Vec3::X, 1.0, red).unwrap();
        scene.add_sphere(Vec3::Y, 1.0, blue).unwrap();

        // Sphere 0 shares red, so it gets a new material
        scene.set_sphere_material(0, MaterialKind::Metal).unwrap();
        assert_eq!(scene.material_count(), 3);
        assert_eq!(scene.sphere_infos()[1].albedo, Color::X.to_array());

        // Removing the last red user drops red and remaps the rest
        scene.remove_sphere(1).unwrap();
        assert_eq!(scene.material_count(), 2);
        let infos = scene.sphere_infos();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].material, MaterialKind::Metal);
        assert_eq!(infos[0].albedo, REASSIGNED_ALBEDO.to_array());
        assert_eq!(infos[1].albedo, Color::Z.to_array());
    }

    #[test]
    fn test_default_matches_new() {
        let mut from_default = Scene::default();
        let mut from_new = Scene::new("");
        for scene in [&mut from_default, &mut from_new] {
            scene.add_default_sphere();
            scene.add_default_sphere();
        }

        assert_eq!(from_default.toggle_controlled(), Ok(1));
        assert_eq!(from_new.toggle_controlled(), Ok(1));
    }

    #[test]
    fn test_sphere_info_tags() {
        let scene = Scene::default_scene();
        assert_eq!(MaterialKind::Metal.type_name(), "metal");
        assert!(scene.sphere_infos()[1].controlled);
        assert!(!scene.sphere_infos()[0].controlled);
    }
}
