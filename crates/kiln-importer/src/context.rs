use std::collections::{BTreeMap, HashMap};

use kiln_scene::{SourceMaterial, SourceMesh, SourceNode};
use kiln_transform::Transform;

use crate::{collision::CollisionBuckets, ImportSettings};

/// Identifies a bone by its mesh and its position in that mesh's bone list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoneKey {
    pub mesh: usize,
    pub bone: usize,
}

/// State shared by the stages of one conversion. Nothing in here outlives [`crate::import_scene`].
pub struct ImportContext<'a> {
    pub settings: &'a ImportSettings,
    pub materials: BTreeMap<SourceMaterial, usize>,
    pub meshes: BTreeMap<SourceMesh, usize>,
    pub nodes: BTreeMap<SourceNode, usize>,
    /// Joint of every bone, resolved once the node tree exists.
    pub deferred_bones: BTreeMap<BoneKey, Option<SourceNode>>,
    /// Mesh data shared per mesh group, used by [`crate::MeshPacking::PackPerMesh`].
    pub mesh_data_by_group: HashMap<usize, usize>,
    /// The single mesh data of [`crate::MeshPacking::PackWholeScene`].
    pub scene_mesh_data: Option<usize>,
    pub collision: CollisionBuckets,
    /// Applied to collision shapes so they stay relative to the original scene root.
    pub collision_correction: Transform,
    pub referenced_textures: Vec<String>,
}

impl<'a> ImportContext<'a> {
    pub fn new(settings: &'a ImportSettings) -> Self {
        Self {
            settings,
            materials: BTreeMap::new(),
            meshes: BTreeMap::new(),
            nodes: BTreeMap::new(),
            deferred_bones: BTreeMap::new(),
            mesh_data_by_group: HashMap::new(),
            scene_mesh_data: None,
            collision: CollisionBuckets::default(),
            collision_correction: Transform::IDENTITY,
            referenced_textures: Vec::new(),
        }
    }
}
