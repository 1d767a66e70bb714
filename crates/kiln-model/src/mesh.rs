use glam::{Mat4, Vec3};

pub mod semantics {
    pub const POSITION: &str = "a_position";
    pub const COLOR: &str = "a_color";
    pub const NORMAL: &str = "a_normal";
    pub const TANGENT: &str = "a_tangent";
    pub const BINORMAL: &str = "a_binormal";
    pub const UV: &str = "a_uv";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Float2,
    Float3,
    Float4,
}

impl VertexFormat {
    pub fn name(self) -> &'static str {
        match self {
            VertexFormat::Float2 => "float2",
            VertexFormat::Float3 => "float3",
            VertexFormat::Float4 => "float4",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "float2" => Some(VertexFormat::Float2),
            "float3" => Some(VertexFormat::Float3),
            "float4" => Some(VertexFormat::Float4),
            _ => None,
        }
    }

    pub fn size_bytes(self) -> u32 {
        match self {
            VertexFormat::Float2 => 8,
            VertexFormat::Float3 => 12,
            VertexFormat::Float4 => 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    Uint16,
    Uint32,
}

impl IndexFormat {
    pub fn name(self) -> &'static str {
        match self {
            IndexFormat::Uint16 => "uint16",
            IndexFormat::Uint32 => "uint32",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "uint16" => Some(IndexFormat::Uint16),
            "uint32" => Some(IndexFormat::Uint32),
            _ => None,
        }
    }

    pub fn size_bytes(self) -> u32 {
        match self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    #[default]
    TriangleList,
    TriangleStrip,
    LineList,
    LineStrip,
    PointList,
}

impl PrimitiveTopology {
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveTopology::TriangleList => "TriangleList",
            PrimitiveTopology::TriangleStrip => "TriangleStrip",
            PrimitiveTopology::LineList => "LineList",
            PrimitiveTopology::LineStrip => "LineStrip",
            PrimitiveTopology::PointList => "PointList",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "TriangleList" => Some(PrimitiveTopology::TriangleList),
            "TriangleStrip" => Some(PrimitiveTopology::TriangleStrip),
            "LineList" => Some(PrimitiveTopology::LineList),
            "LineStrip" => Some(PrimitiveTopology::LineStrip),
            "PointList" => Some(PrimitiveTopology::PointList),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexElement {
    pub semantic: String,
    pub byte_offset: u32,
    pub format: VertexFormat,
}

impl VertexElement {
    pub fn new(semantic: &str, format: VertexFormat) -> Self {
        Self {
            semantic: semantic.to_owned(),
            byte_offset: 0,
            format,
        }
    }
}

/// Drops repeated semantics (the first one wins) and packs the remaining elements
/// back to back. Returns the stride.
pub fn normalize_vertex_decl(elements: &mut Vec<VertexElement>) -> u32 {
    let mut seen = Vec::with_capacity(elements.len());
    elements.retain(|element| {
        if seen.contains(&element.semantic) {
            false
        } else {
            seen.push(element.semantic.clone());
            true
        }
    });

    let mut offset = 0;
    for element in elements.iter_mut() {
        element.byte_offset = offset;
        offset += element.format.size_bytes();
    }
    offset
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    pub const EMPTY: Self = Self {
        min: Vec3::INFINITY,
        max: Vec3::NEG_INFINITY,
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        let mut aabb = Self::EMPTY;
        for point in points {
            aabb.expand(*point);
        }
        aabb
    }

    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_diagonal(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }
}

/// A skinning influence of one joint on a mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    /// Index of the joint node, `None` until bones are resolved against the node tree.
    pub node: Option<usize>,
    pub offset_matrix: Mat4,
    pub vertex_ids: Vec<u32>,
    pub weights: Vec<f32>,
}

impl Bone {
    pub fn new(offset_matrix: Mat4) -> Self {
        Self {
            node: None,
            offset_matrix,
            vertex_ids: Vec::new(),
            weights: Vec::new(),
        }
    }

    pub fn add_influence(&mut self, vertex_id: u32, weight: f32) {
        self.vertex_ids.push(vertex_id);
        self.weights.push(weight);
    }
}

/// Append-only vertex and index bytes shared by one or more meshes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertex_data: Vec<u8>,
    pub index_data: Vec<u8>,
}

impl MeshData {
    /// Appends both buffers and returns their byte offsets.
    pub fn append(&mut self, vertex_bytes: &[u8], index_bytes: &[u8]) -> (u32, u32) {
        let offsets = (self.vertex_data.len() as u32, self.index_data.len() as u32);
        self.vertex_data.extend_from_slice(vertex_bytes);
        self.index_data.extend_from_slice(index_bytes);
        offsets
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub id: u32,
    pub name: String,
    /// Index of the owning [`MeshData`].
    pub mesh_data: usize,
    pub primitive_topology: PrimitiveTopology,
    pub vertex_decl: Vec<VertexElement>,
    pub stride: u32,
    pub vb_byte_offset: u32,
    pub num_vertices: u32,
    pub ib_byte_offset: u32,
    pub ib_format: Option<IndexFormat>,
    /// Number of indices, or vertices for non-indexed meshes.
    pub num_elements: u32,
    pub aabb: Aabb,
    pub bones: Vec<Bone>,
    pub material: Option<usize>,
}

impl Mesh {
    pub fn element(&self, semantic: &str) -> Option<&VertexElement> {
        self.vertex_decl
            .iter()
            .find(|element| element.semantic == semantic)
    }

    pub fn vertex_bytes<'a>(&self, data: &'a MeshData) -> Option<&'a [u8]> {
        let start = self.vb_byte_offset as usize;
        let end = start + (self.num_vertices * self.stride) as usize;
        data.vertex_data.get(start..end)
    }

    pub fn indices(&self, data: &MeshData) -> Option<Vec<u32>> {
        let format = self.ib_format?;
        let start = self.ib_byte_offset as usize;
        let bytes = data
            .index_data
            .get(start..start + (self.num_elements * format.size_bytes()) as usize)?;

        Some(match format {
            IndexFormat::Uint16 => bytemuck::pod_collect_to_vec::<u8, u16>(bytes)
                .into_iter()
                .map(u32::from)
                .collect(),
            IndexFormat::Uint32 => bytemuck::pod_collect_to_vec::<u8, u32>(bytes),
        })
    }

    /// Positions of every vertex, read through the `a_position` element.
    pub fn positions(&self, data: &MeshData) -> Option<Vec<Vec3>> {
        let element = self.element(semantics::POSITION)?;
        let bytes = self.vertex_bytes(data)?;
        let offset = element.byte_offset as usize;

        bytes
            .chunks_exact(self.stride as usize)
            .map(|vertex| {
                let position = vertex.get(offset..offset + 12)?;
                let floats: [f32; 3] = bytemuck::pod_read_unaligned(position);
                Some(Vec3::from(floats))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_decl_is_packed_and_deduplicated() {
        let mut decl = vec![
            VertexElement::new(semantics::POSITION, VertexFormat::Float3),
            VertexElement::new(semantics::COLOR, VertexFormat::Float4),
            VertexElement::new(semantics::POSITION, VertexFormat::Float3),
            VertexElement::new(semantics::UV, VertexFormat::Float2),
        ];
        let stride = normalize_vertex_decl(&mut decl);

        assert_eq!(stride, 36);
        assert_eq!(decl.len(), 3);
        assert_eq!(decl[1].byte_offset, 12);
        assert_eq!(decl[2].byte_offset, 28);
    }

    #[test]
    fn aabb_tracks_extents() {
        let aabb = Aabb::from_points(&[Vec3::new(-1.0, 2.0, 0.0), Vec3::new(3.0, -2.0, 1.0)]);

        assert_eq!(aabb.center(), Vec3::new(1.0, 0.0, 0.5));
        assert_eq!(aabb.half_diagonal(), Vec3::new(2.0, 2.0, 0.5));
        assert!(!aabb.is_empty());
        assert!(Aabb::EMPTY.is_empty());
    }

    #[test]
    fn mesh_reads_back_its_slice_of_the_arena() {
        let mut data = MeshData::default();
        data.append(&[0u8; 12], &[0u8; 4]);

        let positions = [Vec3::X, Vec3::Y];
        let indices = [0u32, 1, 1];
        let (vb, ib) = data.append(
            bytemuck::cast_slice(&positions),
            bytemuck::cast_slice(&indices),
        );

        let mut decl = vec![VertexElement::new(semantics::POSITION, VertexFormat::Float3)];
        let stride = normalize_vertex_decl(&mut decl);
        let mesh = Mesh {
            id: 0,
            name: "line".to_owned(),
            mesh_data: 0,
            primitive_topology: PrimitiveTopology::TriangleList,
            vertex_decl: decl,
            stride,
            vb_byte_offset: vb,
            num_vertices: 2,
            ib_byte_offset: ib,
            ib_format: Some(IndexFormat::Uint32),
            num_elements: 3,
            aabb: Aabb::from_points(&positions),
            bones: Vec::new(),
            material: None,
        };

        assert_eq!(mesh.indices(&data), Some(vec![0, 1, 1]));
        assert_eq!(mesh.positions(&data), Some(positions.to_vec()));
    }
}
