use std::{fs, io::Write, path::Path};

use glam::Vec3;
use kiln_model::{
    Aabb, CollisionMesh, Model, Node, ParameterBlock, ParameterValue, Transform,
};

use crate::{header::*, PackingError};

/// Collects data chunks and hands out their ids in creation order.
#[derive(Default)]
struct ChunkWriter {
    chunks: Vec<Vec<u8>>,
}

impl ChunkWriter {
    fn push(&mut self, bytes: &[u8]) -> u32 {
        self.chunks.push(bytes.to_vec());
        (self.chunks.len() - 1) as u32
    }

    fn push_pod<T: bytemuck::Pod>(&mut self, values: &[T]) -> u32 {
        self.push(bytemuck::cast_slice(values))
    }

    fn descriptor(&self) -> Vec<u64> {
        let mut offset = 0u64;
        let mut descriptor = Vec::with_capacity(self.chunks.len() * 3);
        for (id, chunk) in self.chunks.iter().enumerate() {
            descriptor.extend_from_slice(&[id as u64, offset, chunk.len() as u64]);
            offset += chunk.len() as u64;
        }
        descriptor
    }
}

/// Serializes `model` into the packed format: a pretty printed JSON header directly followed by the
/// data chunks it references.
pub fn write_model(model: &Model) -> Result<Vec<u8>, PackingError> {
    let mut bytes = Vec::new();
    write_model_to(model, &mut bytes)?;
    Ok(bytes)
}

pub fn write_model_to<W: Write>(model: &Model, mut writer: W) -> Result<(), PackingError> {
    kiln_profiling::profile_function!();

    let mut chunks = ChunkWriter::default();
    let header = build_header(model, &mut chunks)?;

    serde_json::to_writer_pretty(&mut writer, &header)?;
    for chunk in &chunks.chunks {
        writer.write_all(chunk)?;
    }

    log::debug!(
        "Packed {} nodes, {} meshes and {} data chunks",
        model.nodes.len(),
        model.meshes.len(),
        chunks.chunks.len()
    );
    Ok(())
}

pub fn write_model_to_file<P: AsRef<Path>>(model: &Model, path: P) -> Result<(), PackingError> {
    let bytes = write_model(model)?;
    fs::write(path.as_ref(), bytes)?;
    log::info!("Wrote {}", path.as_ref().display());
    Ok(())
}

fn build_header(model: &Model, chunks: &mut ChunkWriter) -> Result<ModelHeader, PackingError> {
    let root = model
        .root()
        .ok_or_else(|| PackingError::Malformed("the model has no root node".to_owned()))?;

    let animations = model
        .animations
        .iter()
        .map(|animation| AnimationDesc {
            curve: animation.name.clone(),
            time_offset: animation.start_time,
            duration: animation.duration,
        })
        .collect();

    let node_hierarchy = hierarchy(model, root, |node| node.id)?;
    let debug_node_hierarchy_names = hierarchy(model, root, |node| node.name.clone())?;

    let nodes = model
        .nodes
        .iter()
        .map(|node| node_desc(model, node, chunks))
        .collect::<Result<Vec<_>, _>>()?;

    let materials = model
        .materials
        .iter()
        .map(|material| MaterialDesc {
            id: material.id,
            name: material.name.clone(),
            param_block: param_block(&material.params, chunks),
        })
        .collect();

    let meshes_data = (0..model.mesh_data.len())
        .map(|index| mesh_data_desc(model, index, chunks))
        .collect::<Result<Vec<_>, _>>()?;

    let collision = &model.collision;
    let mut hulls = |hulls: &[CollisionMesh]| -> Vec<HullDesc> {
        hulls
            .iter()
            .map(|hull| HullDesc {
                name: hull.name.clone(),
                verts_chunk_id: chunks.push_pod(&hull.vertices),
                indices_chunk_id: chunks.push_pod(&hull.indices),
            })
            .collect()
    };
    let static_convex_hulls = hulls(&collision.convex_hulls);
    let static_concave_hulls = hulls(&collision.concave_hulls);

    Ok(ModelHeader {
        animations,
        node_hierarchy,
        debug_node_hierarchy_names,
        nodes,
        materials,
        meshes_data,
        static_convex_hulls,
        static_concave_hulls,
        collision_boxes: collision
            .boxes
            .iter()
            .map(|shape| BoxDesc {
                name: shape.name.clone(),
                transform: transform_desc(&shape.transform),
                half_diagonal: shape.half_diagonal.to_array(),
            })
            .collect(),
        collision_capsules: collision
            .capsules
            .iter()
            .map(|shape| CapsuleDesc {
                name: shape.name.clone(),
                transform: transform_desc(&shape.transform),
                half_height: shape.half_height,
                radius: shape.radius,
            })
            .collect(),
        collision_cylinders: collision
            .cylinders
            .iter()
            .map(|shape| BoxDesc {
                name: shape.name.clone(),
                transform: transform_desc(&shape.transform),
                half_diagonal: shape.half_diagonal.to_array(),
            })
            .collect(),
        collision_spheres: collision
            .spheres
            .iter()
            .map(|shape| SphereDesc {
                name: shape.name.clone(),
                transform: transform_desc(&shape.transform),
                radius: shape.radius,
            })
            .collect(),
        data_chunks_desc: chunks.descriptor(),
    })
}

fn hierarchy<T>(
    model: &Model,
    root: &Node,
    key: impl Fn(&Node) -> T,
) -> Result<Vec<HierarchyEntry<T>>, PackingError> {
    let mut entries = vec![HierarchyEntry::Node(key(root))];
    for node in model.nodes.iter().filter(|node| !node.children.is_empty()) {
        let children = node
            .children
            .iter()
            .map(|child| model.nodes.get(*child).map(&key))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| {
                PackingError::Malformed(format!("node '{}' has a dangling child", node.name))
            })?;

        entries.push(HierarchyEntry::Node(key(node)));
        entries.push(HierarchyEntry::Children(children));
    }
    Ok(entries)
}

fn node_desc(
    model: &Model,
    node: &Node,
    chunks: &mut ChunkWriter,
) -> Result<NodeDesc, PackingError> {
    let param_block = param_block(&node.params, chunks);
    let meshes = node
        .meshes
        .iter()
        .map(|attachment| -> Result<_, PackingError> {
            let mesh = model.meshes.get(attachment.mesh).ok_or_else(|| {
                PackingError::Malformed(format!("node '{}' instances a missing mesh", node.name))
            })?;
            Ok(MeshAttachmentDesc {
                mesh_id: mesh.id,
                material_id: material_id(model, attachment.material)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(NodeDesc {
        id: node.id,
        name: node.name.clone(),
        param_block,
        meshes,
    })
}

fn material_id(model: &Model, material: Option<usize>) -> Result<Option<u32>, PackingError> {
    material
        .map(|material| {
            model
                .materials
                .get(material)
                .map(|material| material.id)
                .ok_or_else(|| {
                    PackingError::Malformed(format!("material {} does not exist", material))
                })
        })
        .transpose()
}

fn param_block(params: &ParameterBlock, chunks: &mut ChunkWriter) -> Vec<ParameterDesc> {
    params
        .iter()
        .map(|(name, parameter)| {
            let static_value = match parameter.static_value() {
                ParameterValue::Float(value) => StaticValue::Scalar(*value),
                ParameterValue::String(value) => StaticValue::Text(value.clone()),
                value => StaticValue::Vector(value.components()),
            };

            let curves = parameter
                .curves()
                .map(|(curve_name, curve)| CurveDesc {
                    name: curve_name.to_owned(),
                    keyframes_chunk_id: chunks.push_pod(curve.keys()),
                    values_chunk_id: chunks.push_pod(curve.raw_values()),
                })
                .collect();

            ParameterDesc {
                name: name.to_owned(),
                ty: parameter.ty().name().to_owned(),
                static_value,
                curves,
            }
        })
        .collect()
}

fn mesh_data_desc(
    model: &Model,
    index: usize,
    chunks: &mut ChunkWriter,
) -> Result<MeshDataDesc, PackingError> {
    let data = &model.mesh_data[index];
    let vertex_data_chunk_id =
        (!data.vertex_data.is_empty()).then(|| chunks.push(&data.vertex_data));
    let index_data_chunk_id = (!data.index_data.is_empty()).then(|| chunks.push(&data.index_data));

    let mut meshes = Vec::new();
    for (_, mesh) in model.meshes_in(index) {
        let bones = mesh
            .bones
            .iter()
            .map(|bone| -> Result<_, PackingError> {
                let node = bone
                    .node
                    .and_then(|node| model.nodes.get(node))
                    .ok_or_else(|| {
                        let message = format!("a bone of mesh '{}' has no node", mesh.name);
                        PackingError::Malformed(message)
                    })?;
                Ok(BoneDesc {
                    node_id: node.id,
                    debug_node_name: node.name.clone(),
                    weights_chunk_id: chunks.push_pod(&bone.weights),
                    vert_ids_chunk_id: chunks.push_pod(&bone.vertex_ids),
                    offset_matrix_chunk_id: chunks.push_pod(&bone.offset_matrix.to_cols_array()),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Non-finite numbers have no JSON form, an empty box is written as a point at the origin.
        let aabb = if mesh.aabb.is_empty() {
            Aabb::new(Vec3::ZERO, Vec3::ZERO)
        } else {
            mesh.aabb
        };

        meshes.push(MeshDesc {
            kind: "mesh".to_owned(),
            id: mesh.id,
            name: mesh.name.clone(),
            primitive_topology: mesh.primitive_topology.name().to_owned(),
            vb_byte_offset: mesh.vb_byte_offset,
            num_elements: mesh.num_elements,
            num_vertices: mesh.num_vertices,
            ib_byte_offset: mesh.ib_format.map(|_| mesh.ib_byte_offset),
            ib_format: mesh.ib_format.map(|format| format.name().to_owned()),
            material_id: material_id(model, mesh.material)?,
            vertex_decl: mesh
                .vertex_decl
                .iter()
                .map(|element| VertexElementDesc {
                    semantic: element.semantic.clone(),
                    byte_offset: element.byte_offset,
                    format: element.format.name().to_owned(),
                })
                .collect(),
            bones,
            aabox_min: aabb.min.to_array(),
            aabox_max: aabb.max.to_array(),
        });
    }

    Ok(MeshDataDesc {
        vertex_data_chunk_id,
        index_data_chunk_id,
        meshes,
    })
}

fn transform_desc(transform: &Transform) -> TransformDesc {
    TransformDesc {
        p: transform.translation.to_array(),
        r: transform.rotation.to_array(),
        s: transform.scale.to_array(),
    }
}
