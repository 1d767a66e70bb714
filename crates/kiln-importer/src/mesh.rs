use std::collections::{HashMap, HashSet};

use glam::{Vec3, Vec4};
use kiln_model::{
    normalize_vertex_decl, semantics, Aabb, IndexFormat, Mesh, Model, PrimitiveTopology,
    VertexElement, VertexFormat,
};
use kiln_scene::{ChannelKind, MappingMode, ReferenceMode, SceneSource, SourceMesh, VertexChannel};

use crate::{skeleton, ImportContext, ImportError, MeshPacking};

/// Optional channels in the order they are laid out in a vertex.
const CHANNELS: [(ChannelKind, &str, VertexFormat); 5] = [
    (ChannelKind::Color, semantics::COLOR, VertexFormat::Float4),
    (ChannelKind::Normal, semantics::NORMAL, VertexFormat::Float3),
    (ChannelKind::Tangent, semantics::TANGENT, VertexFormat::Float3),
    (ChannelKind::Binormal, semantics::BINORMAL, VertexFormat::Float3),
    (ChannelKind::Uv, semantics::UV, VertexFormat::Float2),
];

fn channel_name(kind: ChannelKind) -> &'static str {
    match kind {
        ChannelKind::Color => "color",
        ChannelKind::Normal => "normal",
        ChannelKind::Tangent => "tangent",
        ChannelKind::Binormal => "binormal",
        ChannelKind::Uv => "uv",
    }
}

/// Where a vertex attribute comes from.
enum Source<'a> {
    Channel(ChannelKind, &'a VertexChannel),
    FlatNormal,
}

/// A welded vertex and index buffer, plus where every vertex came from.
#[derive(Debug, Clone, PartialEq)]
pub struct WeldedVertices {
    pub vertex_bytes: Vec<u8>,
    pub indices: Vec<u32>,
    /// Originating control point of every welded vertex.
    pub vertex_control_points: Vec<u32>,
    /// `true` if two corners had identical bytes but different control points.
    pub found_duplicate_faces: bool,
}

impl WeldedVertices {
    /// For every control point the welded vertices it produced, in increasing order.
    pub fn control_point_vertices(&self, control_point_count: usize) -> Vec<Vec<u32>> {
        let mut result = vec![Vec::new(); control_point_count];
        for (vertex, control_point) in self.vertex_control_points.iter().enumerate() {
            if let Some(vertices) = result.get_mut(*control_point as usize) {
                vertices.push(vertex as u32);
            }
        }
        result
    }
}

/// Merges corners with identical bytes and identical control point.
///
/// `corner_bytes` holds `stride` bytes per corner, `corner_control_points` one entry per corner.
/// Corners whose bytes match but whose control points differ are kept apart so skin weights can
/// still be assigned per control point.
pub fn weld_vertices(
    corner_bytes: &[u8],
    corner_control_points: &[u32],
    stride: usize,
) -> WeldedVertices {
    let mut vertex_bytes = Vec::with_capacity(corner_bytes.len());
    let mut indices = Vec::with_capacity(corner_control_points.len());
    let mut vertex_control_points = Vec::new();
    let mut found_duplicate_faces = false;

    let mut emitted: HashMap<(&[u8], u32), u32> = HashMap::new();
    let mut seen_bytes: HashSet<&[u8]> = HashSet::new();

    let corners = corner_bytes.chunks_exact(stride.max(1));
    for (bytes, control_point) in corners.zip(corner_control_points.iter().copied()) {
        if let Some(vertex) = emitted.get(&(bytes, control_point)) {
            indices.push(*vertex);
            continue;
        }
        if !seen_bytes.insert(bytes) {
            found_duplicate_faces = true;
        }

        let vertex = vertex_control_points.len() as u32;
        vertex_bytes.extend_from_slice(bytes);
        vertex_control_points.push(control_point);
        emitted.insert((bytes, control_point), vertex);
        indices.push(vertex);
    }

    WeldedVertices {
        vertex_bytes,
        indices,
        vertex_control_points,
        found_duplicate_faces,
    }
}

/// Converts every triangle mesh of the scene. Non-triangle meshes are skipped.
pub fn convert_meshes<S: SceneSource + ?Sized>(
    scene: &S,
    model: &mut Model,
    context: &mut ImportContext,
) -> Result<(), ImportError> {
    kiln_profiling::profile_function!();
    log::info!("Parsing meshes...");

    for index in 0..scene.mesh_count() {
        let source = SourceMesh(index);
        if let Some(mesh) = convert_mesh(scene, source, model, context)? {
            context.meshes.insert(source, mesh);
        }
    }
    Ok(())
}

fn is_triangle_mesh<S: SceneSource + ?Sized>(scene: &S, mesh: SourceMesh) -> bool {
    (0..scene.polygon_count(mesh)).all(|polygon| scene.polygon_size(mesh, polygon) == 3)
}

/// Returns the index of the new mesh, `None` if the mesh was skipped.
pub fn convert_mesh<S: SceneSource + ?Sized>(
    scene: &S,
    source: SourceMesh,
    model: &mut Model,
    context: &mut ImportContext,
) -> Result<Option<usize>, ImportError> {
    kiln_profiling::profile_function!();

    let name = scene.mesh_name(source);
    if !is_triangle_mesh(scene, source) {
        log::warn!("Skipping '{}'. It is not a triangle mesh", name);
        return Ok(None);
    }
    if scene.material_layer_count(source) > 1 {
        return Err(ImportError::UnsupportedTopology {
            mesh: name.to_owned(),
            reason: "more than one material layer".to_owned(),
        });
    }

    let mut sources = Vec::new();
    let mut vertex_decl = vec![VertexElement::new(semantics::POSITION, VertexFormat::Float3)];
    for (kind, semantic, format) in CHANNELS {
        if let Some(channel) = scene.vertex_channel(source, kind) {
            sources.push((Source::Channel(kind, channel), format));
            vertex_decl.push(VertexElement::new(semantic, format));
        } else if kind == ChannelKind::Normal && context.settings.generate_normals {
            sources.push((Source::FlatNormal, format));
            vertex_decl.push(VertexElement::new(semantic, format));
        }
    }
    let stride = normalize_vertex_decl(&mut vertex_decl);

    let control_points = scene.control_points(source);
    let polygon_count = scene.polygon_count(source);
    let corner_count = polygon_count * 3;

    let mut corner_floats = Vec::with_capacity(corner_count * stride as usize / 4);
    let mut corner_control_points = Vec::with_capacity(corner_count);
    let mut aabb = Aabb::EMPTY;

    for polygon in 0..polygon_count {
        let triangle: [u32; 3] =
            std::array::from_fn(|corner| scene.polygon_vertex(source, polygon, corner));
        let [a, b, c] = triangle
            .map(|control_point| control_point_position(name, control_points, control_point));
        let positions = [a?, b?, c?];

        for corner in 0..3 {
            let control_point = triangle[corner];
            let position = positions[corner];
            let corner_index = polygon * 3 + corner;

            aabb.expand(position);
            corner_floats.extend_from_slice(&position.to_array());

            for (attribute, format) in &sources {
                let value = match attribute {
                    Source::Channel(kind, channel) => {
                        read_channel(name, *kind, channel, control_point, corner_index)?
                    }
                    Source::FlatNormal => face_normal(&positions).extend(0.0),
                };
                let flip_v = matches!(attribute, Source::Channel(ChannelKind::Uv, _));
                push_attribute(&mut corner_floats, *format, value, flip_v);
            }
            corner_control_points.push(control_point);
        }
    }

    let welded = weld_vertices(
        bytemuck::cast_slice(&corner_floats),
        &corner_control_points,
        stride as usize,
    );
    if welded.found_duplicate_faces {
        log::warn!(
            "Found duplicate faces in '{}'! The duplicated faces will remain in the output!",
            name
        );
    }

    let mesh_data = select_mesh_data(scene, source, model, context);
    let (vb_byte_offset, ib_byte_offset) = model.mesh_data[mesh_data]
        .append(&welded.vertex_bytes, bytemuck::cast_slice(&welded.indices));

    let mut mesh = Mesh {
        id: model.allocate_id(),
        name: name.to_owned(),
        mesh_data,
        primitive_topology: PrimitiveTopology::TriangleList,
        vertex_decl,
        stride,
        vb_byte_offset,
        num_vertices: welded.vertex_control_points.len() as u32,
        ib_byte_offset,
        ib_format: Some(IndexFormat::Uint32),
        num_elements: welded.indices.len() as u32,
        aabb,
        bones: Vec::new(),
        material: None,
    };

    let mesh_index = model.meshes.len();
    let control_point_vertices = welded.control_point_vertices(control_points.len());
    skeleton::bind_skin(scene, source, &mut mesh, mesh_index, &control_point_vertices, context)?;

    model.meshes.push(mesh);
    Ok(Some(mesh_index))
}

fn control_point_position(
    mesh: &str,
    control_points: &[Vec3],
    control_point: u32,
) -> Result<Vec3, ImportError> {
    control_points
        .get(control_point as usize)
        .copied()
        .ok_or_else(|| ImportError::MalformedChannel {
            mesh: mesh.to_owned(),
            channel: "position",
            index: control_point as usize,
        })
}

/// Reads one element of `channel` for a corner, honouring its mapping and reference modes.
pub fn read_channel(
    mesh: &str,
    kind: ChannelKind,
    channel: &VertexChannel,
    control_point: u32,
    corner: usize,
) -> Result<Vec4, ImportError> {
    let malformed = |index: usize| ImportError::MalformedChannel {
        mesh: mesh.to_owned(),
        channel: channel_name(kind),
        index,
    };

    let element = match channel.mapping {
        MappingMode::ByControlPoint => control_point as usize,
        MappingMode::ByPolygonVertex => corner,
        mode => {
            return Err(ImportError::UnknownAddressingMode {
                mesh: mesh.to_owned(),
                channel: channel_name(kind),
                mode: format!("{:?}", mode),
            })
        }
    };

    let direct = match channel.reference {
        ReferenceMode::Direct => element,
        ReferenceMode::Index | ReferenceMode::IndexToDirect => *channel
            .index
            .get(element)
            .ok_or_else(|| malformed(element))? as usize,
    };

    channel.direct.get(direct).copied().ok_or_else(|| malformed(direct))
}

fn push_attribute(floats: &mut Vec<f32>, format: VertexFormat, value: Vec4, flip_v: bool) {
    match format {
        VertexFormat::Float2 if flip_v => floats.extend_from_slice(&[value.x, 1.0 - value.y]),
        VertexFormat::Float2 => floats.extend_from_slice(&[value.x, value.y]),
        VertexFormat::Float3 => floats.extend_from_slice(&value.truncate().to_array()),
        VertexFormat::Float4 => floats.extend_from_slice(&value.to_array()),
    }
}

fn face_normal(positions: &[Vec3; 3]) -> Vec3 {
    (positions[1] - positions[0])
        .cross(positions[2] - positions[0])
        .normalize_or_zero()
}

/// Picks the mesh data a new mesh is appended to, creating it when the packing policy asks for one.
fn select_mesh_data<S: SceneSource + ?Sized>(
    scene: &S,
    source: SourceMesh,
    model: &mut Model,
    context: &mut ImportContext,
) -> usize {
    match context.settings.mesh_packing {
        MeshPacking::NoPacking => model.add_mesh_data(),
        MeshPacking::PackWholeScene => *context
            .scene_mesh_data
            .get_or_insert_with(|| model.add_mesh_data()),
        MeshPacking::PackPerMesh => *context
            .mesh_data_by_group
            .entry(scene.mesh_group(source))
            .or_insert_with(|| model.add_mesh_data()),
    }
}
