use crate::RelocationPolicy;

/// How converted meshes are grouped into shared vertex/index arenas.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum MeshPacking {
    /// Every mesh of the scene goes into one mesh data.
    PackWholeScene,
    /// Meshes split from the same authored geometry share a mesh data.
    PackPerMesh,
    /// Every mesh gets its own mesh data.
    #[default]
    NoPacking,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSettings {
    pub export_animations: bool,
    pub mesh_packing: MeshPacking,
    /// Directory of the scene file, texture paths are resolved against it.
    pub file_directory: String,
    pub relocation: RelocationPolicy,
    /// Emit per-face normals for meshes that carry none.
    pub generate_normals: bool,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            export_animations: true,
            mesh_packing: MeshPacking::default(),
            file_directory: String::new(),
            relocation: RelocationPolicy::default(),
            generate_normals: false,
        }
    }
}
