//! JSON header of a packed model. Field names are part of the file format.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelHeader {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub animations: Vec<AnimationDesc>,
    /// Root id first, then every node with children followed by the ids of those children.
    #[serde(rename = "nodeHierarchy")]
    pub node_hierarchy: Vec<HierarchyEntry<u32>>,
    /// Same layout as `node_hierarchy` with names instead of ids. Only meant for humans.
    #[serde(rename = "debug_nodeHierarchyNames", default)]
    pub debug_node_hierarchy_names: Vec<HierarchyEntry<String>>,
    pub nodes: Vec<NodeDesc>,
    pub materials: Vec<MaterialDesc>,
    #[serde(rename = "meshesData")]
    pub meshes_data: Vec<MeshDataDesc>,
    #[serde(rename = "staticConvexHulls", default, skip_serializing_if = "Vec::is_empty")]
    pub static_convex_hulls: Vec<HullDesc>,
    #[serde(rename = "staticConcaveHulls", default, skip_serializing_if = "Vec::is_empty")]
    pub static_concave_hulls: Vec<HullDesc>,
    #[serde(rename = "collisionBoxes", default, skip_serializing_if = "Vec::is_empty")]
    pub collision_boxes: Vec<BoxDesc>,
    #[serde(rename = "collisionCapsules", default, skip_serializing_if = "Vec::is_empty")]
    pub collision_capsules: Vec<CapsuleDesc>,
    #[serde(rename = "collisionCylinders", default, skip_serializing_if = "Vec::is_empty")]
    pub collision_cylinders: Vec<BoxDesc>,
    #[serde(rename = "collisionSpheres", default, skip_serializing_if = "Vec::is_empty")]
    pub collision_spheres: Vec<SphereDesc>,
    /// Flat `[id, byte offset, byte size, ...]` triples, offsets relative to the end of the header.
    #[serde(rename = "dataChunksDesc")]
    pub data_chunks_desc: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationDesc {
    pub curve: String,
    #[serde(rename = "timeOffset")]
    pub time_offset: f32,
    pub duration: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HierarchyEntry<T> {
    Node(T),
    Children(Vec<T>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDesc {
    pub id: u32,
    pub name: String,
    #[serde(rename = "paramBlock")]
    pub param_block: Vec<ParameterDesc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meshes: Vec<MeshAttachmentDesc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshAttachmentDesc {
    pub mesh_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_id: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDesc {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(rename = "staticValue")]
    pub static_value: StaticValue,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub curves: Vec<CurveDesc>,
}

/// A scalar for `Float`, an array for vector types and a string for `String`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StaticValue {
    Scalar(f32),
    Vector(Vec<f32>),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveDesc {
    pub name: String,
    #[serde(rename = "keyframesChunkId")]
    pub keyframes_chunk_id: u32,
    #[serde(rename = "valuesChunkId")]
    pub values_chunk_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialDesc {
    pub id: u32,
    pub name: String,
    #[serde(rename = "paramBlock")]
    pub param_block: Vec<ParameterDesc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshDataDesc {
    #[serde(rename = "vertexDataChunkId", default, skip_serializing_if = "Option::is_none")]
    pub vertex_data_chunk_id: Option<u32>,
    #[serde(rename = "indexDataChunkId", default, skip_serializing_if = "Option::is_none")]
    pub index_data_chunk_id: Option<u32>,
    pub meshes: Vec<MeshDesc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshDesc {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: u32,
    pub name: String,
    #[serde(rename = "primitiveTopology")]
    pub primitive_topology: String,
    #[serde(rename = "vbByteOffset")]
    pub vb_byte_offset: u32,
    #[serde(rename = "numElements")]
    pub num_elements: u32,
    #[serde(rename = "numVertices")]
    pub num_vertices: u32,
    #[serde(rename = "ibByteOffset", default, skip_serializing_if = "Option::is_none")]
    pub ib_byte_offset: Option<u32>,
    #[serde(rename = "ibFormat", default, skip_serializing_if = "Option::is_none")]
    pub ib_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_id: Option<u32>,
    #[serde(rename = "vertexDecl")]
    pub vertex_decl: Vec<VertexElementDesc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bones: Vec<BoneDesc>,
    #[serde(rename = "AABoxMin")]
    pub aabox_min: [f32; 3],
    #[serde(rename = "AABoxMax")]
    pub aabox_max: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexElementDesc {
    pub semantic: String,
    #[serde(rename = "byteOffset")]
    pub byte_offset: u32,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoneDesc {
    pub node_id: u32,
    #[serde(default)]
    pub debug_node_name: String,
    #[serde(rename = "weightsChunkId")]
    pub weights_chunk_id: u32,
    #[serde(rename = "vertIdsChunkId")]
    pub vert_ids_chunk_id: u32,
    #[serde(rename = "offsetMatrixChunkId")]
    pub offset_matrix_chunk_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HullDesc {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "vertsChunkId")]
    pub verts_chunk_id: u32,
    #[serde(rename = "indicesChunkId")]
    pub indices_chunk_id: u32,
}

/// Translation, rotation quaternion (xyzw) and scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformDesc {
    pub p: [f32; 3],
    pub r: [f32; 4],
    pub s: [f32; 3],
}

/// Used for boxes and cylinders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxDesc {
    pub name: String,
    pub transform: TransformDesc,
    #[serde(rename = "halfDiagonal")]
    pub half_diagonal: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapsuleDesc {
    pub name: String,
    pub transform: TransformDesc,
    #[serde(rename = "halfHeight")]
    pub half_height: f32,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SphereDesc {
    pub name: String,
    pub transform: TransformDesc,
    pub radius: f32,
}
