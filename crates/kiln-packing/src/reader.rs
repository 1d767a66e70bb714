use std::{collections::BTreeMap, fs, path::Path};

use glam::{Mat4, Quat, Vec3};
use kiln_model::{
    Aabb, AnimationInfo, Bone, CollisionBox, CollisionCapsule, CollisionCylinder, CollisionMesh,
    CollisionSphere, IndexFormat, Material, Mesh, MeshAttachment, MeshData, Model, Node, Parameter,
    ParameterBlock, ParameterCurve, ParameterType, ParameterValue, PrimitiveTopology, Transform,
    VertexElement, VertexFormat,
};

use crate::{header::*, PackingError};

fn malformed(message: impl Into<String>) -> PackingError {
    PackingError::Malformed(message.into())
}

/// Random access to the data chunks that follow the header.
struct ChunkReader<'a> {
    chunks: BTreeMap<u32, &'a [u8]>,
}

impl<'a> ChunkReader<'a> {
    fn new(descriptor: &[u64], data: &'a [u8]) -> Result<Self, PackingError> {
        if descriptor.len() % 3 != 0 {
            return Err(malformed("dataChunksDesc is not made of triples"));
        }

        let mut chunks = BTreeMap::new();
        for triple in descriptor.chunks_exact(3) {
            let (id, offset, size) = (triple[0] as u32, triple[1] as usize, triple[2] as usize);
            let bytes = offset
                .checked_add(size)
                .and_then(|end| data.get(offset..end))
                .ok_or_else(|| malformed(format!("data chunk {} lies outside the file", id)))?;
            chunks.insert(id, bytes);
        }
        Ok(Self { chunks })
    }

    fn bytes(&self, id: u32) -> Result<&'a [u8], PackingError> {
        self.chunks
            .get(&id)
            .copied()
            .ok_or(PackingError::MissingChunk(id))
    }

    fn pod<T: bytemuck::Pod>(&self, id: u32) -> Result<Vec<T>, PackingError> {
        let bytes = self.bytes(id)?;
        let element_size = std::mem::size_of::<T>();
        if bytes.len() % element_size != 0 {
            return Err(PackingError::MisalignedChunk {
                id,
                size: bytes.len(),
                element_size,
            });
        }
        Ok(bytemuck::pod_collect_to_vec(bytes))
    }
}

/// Splits a packed model into its header and the data chunk bytes that follow it.
pub fn read_header(bytes: &[u8]) -> Result<(ModelHeader, &[u8]), PackingError> {
    let mut stream = serde_json::Deserializer::from_slice(bytes).into_iter::<ModelHeader>();
    let header = stream
        .next()
        .ok_or_else(|| malformed("the file has no header"))??;
    Ok((header, &bytes[stream.byte_offset()..]))
}

/// Parses a packed model.
pub fn read_model(bytes: &[u8]) -> Result<Model, PackingError> {
    kiln_profiling::profile_function!();

    let (header, data) = read_header(bytes)?;
    let chunks = ChunkReader::new(&header.data_chunks_desc, data)?;

    let mut model = Model::new();

    for desc in &header.materials {
        model.materials.push(Material {
            id: desc.id,
            name: desc.name.clone(),
            params: read_param_block(&desc.param_block, &chunks)?,
        });
        model.reserve_id(desc.id);
    }

    let mut node_ids = BTreeMap::new();
    for desc in &header.nodes {
        node_ids.insert(desc.id, model.nodes.len());
        model.nodes.push(Node {
            id: desc.id,
            name: desc.name.clone(),
            params: read_param_block(&desc.param_block, &chunks)?,
            children: Vec::new(),
            meshes: Vec::new(),
        });
        model.reserve_id(desc.id);
    }
    read_hierarchy(&header.node_hierarchy, &node_ids, &mut model)?;

    for desc in &header.meshes_data {
        read_mesh_data(desc, &node_ids, &chunks, &mut model)?;
    }

    for (index, desc) in header.nodes.iter().enumerate() {
        for attachment in &desc.meshes {
            let mesh = model
                .mesh_by_id(attachment.mesh_id)
                .ok_or_else(|| malformed(format!("mesh {} does not exist", attachment.mesh_id)))?;
            let material = material_index(&model, attachment.material_id)?;
            model.nodes[index].meshes.push(MeshAttachment { mesh, material });
        }
    }

    model.animations = header
        .animations
        .iter()
        .map(|animation| AnimationInfo {
            name: animation.curve.clone(),
            start_time: animation.time_offset,
            duration: animation.duration,
        })
        .collect();

    read_collision(&header, &chunks, &mut model)?;

    Ok(model)
}

pub fn read_model_from_file<P: AsRef<Path>>(path: P) -> Result<Model, PackingError> {
    let bytes = fs::read(path.as_ref())?;
    read_model(&bytes)
}

fn material_index(model: &Model, id: Option<u32>) -> Result<Option<usize>, PackingError> {
    id.map(|id| {
        model
            .material_by_id(id)
            .ok_or_else(|| malformed(format!("material {} does not exist", id)))
    })
    .transpose()
}

fn read_param_block(
    descs: &[ParameterDesc],
    chunks: &ChunkReader,
) -> Result<ParameterBlock, PackingError> {
    let mut block = ParameterBlock::new();
    for desc in descs {
        let ty = ParameterType::from_name(&desc.ty)
            .ok_or_else(|| malformed(format!("unknown parameter type '{}'", desc.ty)))?;

        let value = match (&desc.static_value, ty) {
            (StaticValue::Text(text), ParameterType::String) => {
                Some(ParameterValue::String(text.clone()))
            }
            (StaticValue::Scalar(value), ty) => ParameterValue::from_components(ty, &[*value]),
            (StaticValue::Vector(values), ty) => ParameterValue::from_components(ty, values),
            (StaticValue::Text(_), _) => None,
        }
        .ok_or_else(|| {
            malformed(format!("parameter '{}' does not hold a {}", desc.name, desc.ty))
        })?;

        let mut parameter = Parameter::new(value);
        for curve in &desc.curves {
            let keys = chunks.pod::<f32>(curve.keyframes_chunk_id)?;
            let values = chunks.pod::<f32>(curve.values_chunk_id)?;
            let curve_data = ParameterCurve::from_raw(ty, keys, values).ok_or_else(|| {
                malformed(format!("curve '{}' of '{}' is inconsistent", curve.name, desc.name))
            })?;
            parameter.insert_curve(&curve.name, curve_data);
        }
        block.insert(&desc.name, parameter);
    }
    Ok(block)
}

fn read_hierarchy(
    entries: &[HierarchyEntry<u32>],
    node_ids: &BTreeMap<u32, usize>,
    model: &mut Model,
) -> Result<(), PackingError> {
    let node = |id: &u32| {
        node_ids
            .get(id)
            .copied()
            .ok_or_else(|| malformed(format!("node {} does not exist", id)))
    };

    let mut entries = entries.iter();
    match entries.next() {
        Some(HierarchyEntry::Node(root)) => model.root_node = Some(node(root)?),
        None if node_ids.is_empty() => return Ok(()),
        _ => return Err(malformed("nodeHierarchy does not start with the root id")),
    }

    while let Some(entry) = entries.next() {
        let (HierarchyEntry::Node(parent), Some(HierarchyEntry::Children(children))) =
            (entry, entries.next())
        else {
            return Err(malformed("nodeHierarchy entries must be id, [children] pairs"));
        };

        let parent = node(parent)?;
        for child in children {
            let child = node(child)?;
            model.nodes[parent].children.push(child);
        }
    }
    Ok(())
}

fn read_mesh_data(
    desc: &MeshDataDesc,
    node_ids: &BTreeMap<u32, usize>,
    chunks: &ChunkReader,
    model: &mut Model,
) -> Result<(), PackingError> {
    let chunk_or_empty = |id: Option<u32>| -> Result<Vec<u8>, PackingError> {
        id.map(|id| chunks.bytes(id).map(<[u8]>::to_vec))
            .transpose()
            .map(Option::unwrap_or_default)
    };

    let mesh_data = model.mesh_data.len();
    model.mesh_data.push(MeshData {
        vertex_data: chunk_or_empty(desc.vertex_data_chunk_id)?,
        index_data: chunk_or_empty(desc.index_data_chunk_id)?,
    });

    for mesh in &desc.meshes {
        let primitive_topology = PrimitiveTopology::from_name(&mesh.primitive_topology)
            .ok_or_else(|| malformed(format!("unknown topology '{}'", mesh.primitive_topology)))?;
        let ib_format = mesh
            .ib_format
            .as_deref()
            .map(|name| {
                IndexFormat::from_name(name)
                    .ok_or_else(|| malformed(format!("unknown index format '{}'", name)))
            })
            .transpose()?;

        let vertex_decl = mesh
            .vertex_decl
            .iter()
            .map(|element| {
                let format = VertexFormat::from_name(&element.format).ok_or_else(|| {
                    malformed(format!("unknown vertex format '{}'", element.format))
                })?;
                Ok(VertexElement {
                    semantic: element.semantic.clone(),
                    byte_offset: element.byte_offset,
                    format,
                })
            })
            .collect::<Result<Vec<_>, PackingError>>()?;
        let stride = vertex_decl
            .iter()
            .map(|element| element.byte_offset + element.format.size_bytes())
            .max()
            .unwrap_or(0);

        let bones = mesh
            .bones
            .iter()
            .map(|bone| {
                let node = node_ids.get(&bone.node_id).copied().ok_or_else(|| {
                    malformed(format!("bone node {} does not exist", bone.node_id))
                })?;
                let matrix = chunks.pod::<f32>(bone.offset_matrix_chunk_id)?;
                let offset_matrix = <[f32; 16]>::try_from(matrix.as_slice())
                    .map(|columns| Mat4::from_cols_array(&columns))
                    .map_err(|_| malformed("bone offset matrix is not 16 floats"))?;

                let vertex_ids = chunks.pod::<u32>(bone.vert_ids_chunk_id)?;
                let weights = chunks.pod::<f32>(bone.weights_chunk_id)?;
                if vertex_ids.len() != weights.len() {
                    return Err(malformed(format!(
                        "bone of mesh '{}' has {} vertices but {} weights",
                        mesh.name,
                        vertex_ids.len(),
                        weights.len()
                    )));
                }

                Ok(Bone {
                    node: Some(node),
                    offset_matrix,
                    vertex_ids,
                    weights,
                })
            })
            .collect::<Result<Vec<_>, PackingError>>()?;

        model.meshes.push(Mesh {
            id: mesh.id,
            name: mesh.name.clone(),
            mesh_data,
            primitive_topology,
            vertex_decl,
            stride,
            vb_byte_offset: mesh.vb_byte_offset,
            num_vertices: mesh.num_vertices,
            ib_byte_offset: mesh.ib_byte_offset.unwrap_or(0),
            ib_format,
            num_elements: mesh.num_elements,
            aabb: Aabb::new(Vec3::from(mesh.aabox_min), Vec3::from(mesh.aabox_max)),
            bones,
            material: material_index(model, mesh.material_id)?,
        });
        model.reserve_id(mesh.id);
    }
    Ok(())
}

fn read_transform(desc: &TransformDesc) -> Transform {
    Transform::new(
        Vec3::from(desc.p),
        Quat::from_array(desc.r),
        Vec3::from(desc.s),
    )
}

fn read_collision(
    header: &ModelHeader,
    chunks: &ChunkReader,
    model: &mut Model,
) -> Result<(), PackingError> {
    let hull = |desc: &HullDesc| -> Result<CollisionMesh, PackingError> {
        Ok(CollisionMesh {
            name: desc.name.clone(),
            vertices: chunks.pod::<Vec3>(desc.verts_chunk_id)?,
            indices: chunks.pod::<u32>(desc.indices_chunk_id)?,
        })
    };

    let shapes = &mut model.collision;
    shapes.convex_hulls = header
        .static_convex_hulls
        .iter()
        .map(hull)
        .collect::<Result<_, _>>()?;
    shapes.concave_hulls = header
        .static_concave_hulls
        .iter()
        .map(hull)
        .collect::<Result<_, _>>()?;

    shapes.boxes = header
        .collision_boxes
        .iter()
        .map(|desc| CollisionBox {
            name: desc.name.clone(),
            transform: read_transform(&desc.transform),
            half_diagonal: Vec3::from(desc.half_diagonal),
        })
        .collect();
    shapes.capsules = header
        .collision_capsules
        .iter()
        .map(|desc| CollisionCapsule {
            name: desc.name.clone(),
            transform: read_transform(&desc.transform),
            half_height: desc.half_height,
            radius: desc.radius,
        })
        .collect();
    shapes.cylinders = header
        .collision_cylinders
        .iter()
        .map(|desc| CollisionCylinder {
            name: desc.name.clone(),
            transform: read_transform(&desc.transform),
            half_diagonal: Vec3::from(desc.half_diagonal),
        })
        .collect();
    shapes.spheres = header
        .collision_spheres
        .iter()
        .map(|desc| CollisionSphere {
            name: desc.name.clone(),
            transform: read_transform(&desc.transform),
            radius: desc.radius,
        })
        .collect();

    Ok(())
}
