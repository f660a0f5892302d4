//! Lumen Core - Scene description for the interactive path tracer.
//!
//! This crate provides:
//!
//! - **Scene types**: `Scene`, `Material`, `SphereInstance`
//! - **Editing surface**: add/remove spheres, swap material variants, recolor
//!   materials and rotate which sphere is driven by input
//!
//! The renderer builds its own intersectable geometry from a `Scene` once per
//! frame, so the scene can be edited freely between frames.
//!
//! # Example
//!
//! ```
//! use lumen_core::{MaterialKind, Scene};
//!
//! let mut scene = Scene::default_scene();
//! let index = scene.add_default_sphere();
//! scene.set_sphere_material(index, MaterialKind::Metal)?;
//! assert_eq!(scene.sphere_count(), 3);
//! # Ok::<(), lumen_core::SceneError>(())
//! ```

pub mod scene;

pub use scene::{Material, MaterialKind, Scene, SceneError, SceneResult, SphereInfo, SphereInstance};
