//! Mesh session used by the scaling stage.
//!
//! A [`Scene`] is created per invocation by [`Scene::import_obj`], measured and
//! rescaled by [`scale_to_measurement`], optionally recoloured with
//! [`apply_monochrome`] and written out by [`export_glb`]. [`ScalingJob`]
//! runs the whole sequence.

mod export;
mod import;
mod material;
mod pipeline;
mod scaler;
mod scene;

pub use export::export_glb;
pub use material::{apply_monochrome, monochrome_key, Material, MaterialId, MaterialLibrary};
pub use pipeline::{ScaleReport, ScalingJob};
pub use scaler::scale_to_measurement;
pub use scene::{Aabb, MeshPart, Scene};
