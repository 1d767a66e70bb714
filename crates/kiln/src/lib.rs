#![doc(html_no_source)]

mod convert;
mod kiln;
pub use convert::{convert_gltf, convert_scene, default_output_path};
pub use kiln::Kiln;

// Reexport all crates
pub use kiln_importer;
pub use kiln_model;
pub use kiln_packing;
pub use kiln_profiling;
pub use kiln_scene;
pub use kiln_transform;
