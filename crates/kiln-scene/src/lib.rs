//! Read-only view of an authored scene graph, the input side of a conversion.
//!
//! Importers only talk to [`SceneSource`]. [`MemoryScene`] is the owned implementation used by the
//! glTF loader and by tests that assemble scenes by hand.

use glam::{Mat4, Quat, Vec3, Vec4};
use kiln_transform::{euler_degrees_from_quat, quat_from_euler_degrees, RotationOrder, Transform};

pub mod gltf_loader;
mod memory;

pub use memory::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceNode(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceMesh(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceMaterial(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceLayer(pub usize);

/// Optional per-corner channels of a mesh. Positions are always present as control points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChannelKind {
    Color,
    Normal,
    Tangent,
    Binormal,
    Uv,
}

/// What a channel element is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingMode {
    ByControlPoint,
    ByPolygonVertex,
    ByPolygon,
    ByEdge,
    AllSame,
}

/// How a channel element is looked up in `direct`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceMode {
    Direct,
    Index,
    IndexToDirect,
}

/// One layer element of a mesh. Values are widened to `Vec4`, unused lanes are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexChannel {
    pub mapping: MappingMode,
    pub reference: ReferenceMode,
    pub direct: Vec<Vec4>,
    pub index: Vec<u32>,
}

impl VertexChannel {
    pub fn by_control_point(direct: Vec<Vec4>) -> Self {
        Self {
            mapping: MappingMode::ByControlPoint,
            reference: ReferenceMode::Direct,
            direct,
            index: Vec::new(),
        }
    }

    pub fn by_polygon_vertex(direct: Vec<Vec4>) -> Self {
        Self {
            mapping: MappingMode::ByPolygonVertex,
            reference: ReferenceMode::Direct,
            direct,
            index: Vec::new(),
        }
    }

    pub fn indexed(mapping: MappingMode, direct: Vec<Vec4>, index: Vec<u32>) -> Self {
        Self {
            mapping,
            reference: ReferenceMode::IndexToDirect,
            direct,
            index,
        }
    }
}

/// Binding of one joint to a skinned mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct SkinCluster {
    pub link: Option<SourceNode>,
    /// World transform of the mesh at bind time.
    pub transform: Mat4,
    /// World transform of the joint at bind time.
    pub transform_link: Mat4,
    pub control_points: Vec<u32>,
    pub weights: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Deformer {
    Skin(Vec<SkinCluster>),
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeAttribute {
    Skeleton { size: f32 },
    Mesh(SourceMesh),
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Compound,
    Scalar(f32),
    Vector(Vec3),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialProperty {
    pub value: PropertyValue,
    /// Relative file name of the first file texture connected to the property.
    pub texture: Option<String>,
}

impl MaterialProperty {
    pub fn value(value: PropertyValue) -> Self {
        Self {
            value,
            texture: None,
        }
    }

    pub fn texture(file_name: &str) -> Self {
        Self {
            value: PropertyValue::Compound,
            texture: Some(file_name.to_owned()),
        }
    }
}

/// A node transform as authored: Euler rotation in degrees applied in `rotation_order`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceTransform {
    pub translation: Vec3,
    pub rotation: Vec3,
    pub rotation_order: RotationOrder,
    pub scaling: Vec3,
}

impl Default for SourceTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            rotation_order: RotationOrder::Xyz,
            scaling: Vec3::ONE,
        }
    }
}

impl SourceTransform {
    pub fn from_transform(transform: &Transform) -> Self {
        let rotation = euler_degrees_from_quat(RotationOrder::Xyz, transform.rotation)
            .unwrap_or(Vec3::ZERO);

        Self {
            translation: transform.translation,
            rotation,
            rotation_order: RotationOrder::Xyz,
            scaling: transform.scale,
        }
    }

    pub fn from_matrix(matrix: Mat4) -> Self {
        Self::from_transform(&Transform::from(matrix))
    }

    /// `None` when the rotation order has no Euler composition.
    pub fn rotation_quat(&self) -> Option<Quat> {
        quat_from_euler_degrees(self.rotation_order, self.rotation)
    }

    pub fn to_transform(&self) -> Option<Transform> {
        Some(Transform::new(
            self.translation,
            self.rotation_quat()?,
            self.scaling,
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformChannel {
    Translation,
    Rotation,
    Scaling,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationStack {
    pub name: String,
    pub start: f32,
    pub stop: f32,
    pub layers: Vec<SourceLayer>,
}

/// A point in time on one animation stack. `None` in evaluation calls means the bind pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationSample {
    pub stack: usize,
    pub time: f32,
}

/// Read API over an authored scene.
///
/// Nodes, meshes and materials are addressed by dense indices, `SourceNode(0..node_count())` and so on.
pub trait SceneSource {
    fn material_count(&self) -> usize;
    fn material_name(&self, material: SourceMaterial) -> &str;
    /// Looks up a property by path, nested properties are separated by `|` (`"Maya|base_color"`).
    fn material_property(&self, material: SourceMaterial, path: &str) -> Option<&MaterialProperty>;

    fn mesh_count(&self) -> usize;
    fn mesh_name(&self, mesh: SourceMesh) -> &str;
    /// Meshes split from the same authored geometry share a group.
    fn mesh_group(&self, mesh: SourceMesh) -> usize;
    fn polygon_count(&self, mesh: SourceMesh) -> usize;
    fn polygon_size(&self, mesh: SourceMesh, polygon: usize) -> usize;
    fn polygon_vertex(&self, mesh: SourceMesh, polygon: usize, corner: usize) -> u32;
    fn control_points(&self, mesh: SourceMesh) -> &[Vec3];
    fn material_layer_count(&self, mesh: SourceMesh) -> usize;
    fn vertex_channel(&self, mesh: SourceMesh, kind: ChannelKind) -> Option<&VertexChannel>;
    fn deformers(&self, mesh: SourceMesh) -> &[Deformer];

    fn root_node(&self) -> SourceNode;
    fn node_count(&self) -> usize;
    fn node_name(&self, node: SourceNode) -> &str;
    fn node_children(&self, node: SourceNode) -> &[SourceNode];
    fn node_attributes(&self, node: SourceNode) -> &[NodeAttribute];
    /// Material bound to the attribute at `slot`.
    fn node_material(&self, node: SourceNode, slot: usize) -> Option<SourceMaterial>;
    fn evaluate_local_transform(
        &self,
        node: SourceNode,
        sample: Option<AnimationSample>,
    ) -> SourceTransform;
    fn evaluate_global_transform(
        &self,
        node: SourceNode,
        sample: Option<AnimationSample>,
    ) -> SourceTransform;

    fn animation_stacks(&self) -> &[AnimationStack];
    /// Key times of the curve driving `channel` of `node` on `layer`, `None` if there is no such curve.
    fn curve_key_times(
        &self,
        node: SourceNode,
        layer: SourceLayer,
        channel: TransformChannel,
    ) -> Option<Vec<f32>>;
}
