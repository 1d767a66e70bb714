//! Packed model file: a JSON header describing the model followed by the binary data chunks it
//! references.

use std::io;

use thiserror::Error;

pub mod header;
mod reader;
mod writer;

pub use reader::{read_header, read_model, read_model_from_file};
pub use writer::{write_model, write_model_to, write_model_to_file};

#[derive(Debug, Error)]
pub enum PackingError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("Invalid model header: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Data chunk {0} is referenced but not present")]
    MissingChunk(u32),

    #[error("Data chunk {id} is {size} bytes which is not a multiple of {element_size}")]
    MisalignedChunk {
        id: u32,
        size: usize,
        element_size: usize,
    },

    #[error("Malformed model: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Quat, Vec3, Vec4};
    use kiln_model::{
        material, normalize_vertex_decl, semantics, Aabb, AnimationInfo, Bone, CollisionBox,
        CollisionMesh, IndexFormat, Mesh, MeshAttachment, Model, Parameter, ParameterValue,
        PrimitiveTopology, Transform, VertexElement, VertexFormat, TRANSLATION,
    };

    fn sample_model() -> Model {
        let mut model = Model::new();

        let diffuse = model.add_material("painted");
        let params = &mut model.materials[diffuse].params;
        params.insert(
            material::DIFFUSE_COLOR,
            Parameter::new(ParameterValue::Float4(Vec4::new(0.5, 0.25, 1.0, 1.0))),
        );
        params.insert(material::METALLIC, Parameter::new(ParameterValue::Float(0.5)));
        model.materials[diffuse].set_texture(material::TEX_DIFFUSE, "textures/wood.png");

        let root = model.add_node("root");
        let arm = model.add_node("arm");
        model.root_node = Some(root);
        model.nodes[root].children.push(arm);

        let mut translation = Parameter::new(ParameterValue::Float3(Vec3::new(1.0, 2.0, 3.0)));
        let curve = translation.create_curve("walk");
        curve.add(0.0, &ParameterValue::Float3(Vec3::ZERO));
        curve.add(1.5, &ParameterValue::Float3(Vec3::X));
        model.nodes[arm].params.insert(TRANSLATION, translation);
        model.animations.push(AnimationInfo {
            name: "walk".to_owned(),
            start_time: 0.0,
            duration: 1.5,
        });

        let positions = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let indices = [0u32, 1, 2];
        let mesh_data = model.add_mesh_data();
        let (vb_byte_offset, ib_byte_offset) = model.mesh_data[mesh_data]
            .append(bytemuck::cast_slice(&positions), bytemuck::cast_slice(&indices));

        let mut vertex_decl = vec![VertexElement::new(semantics::POSITION, VertexFormat::Float3)];
        let stride = normalize_vertex_decl(&mut vertex_decl);

        let mut bone = Bone::new(Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0)));
        bone.add_influence(0, 1.0);
        bone.add_influence(2, 0.5);
        bone.node = Some(arm);

        let id = model.allocate_id();
        model.meshes.push(Mesh {
            id,
            name: "triangle".to_owned(),
            mesh_data,
            primitive_topology: PrimitiveTopology::TriangleList,
            vertex_decl,
            stride,
            vb_byte_offset,
            num_vertices: 3,
            ib_byte_offset,
            ib_format: Some(IndexFormat::Uint32),
            num_elements: 3,
            aabb: Aabb::from_points(&positions),
            bones: vec![bone],
            material: None,
        });
        model.nodes[arm].meshes.push(MeshAttachment {
            mesh: 0,
            material: Some(diffuse),
        });

        model.collision.convex_hulls.push(CollisionMesh {
            name: "rock".to_owned(),
            vertices: positions.to_vec(),
            indices: indices.to_vec(),
        });
        model.collision.boxes.push(CollisionBox {
            name: "crate".to_owned(),
            transform: Transform::new(Vec3::ONE, Quat::IDENTITY, Vec3::splat(2.0)),
            half_diagonal: Vec3::new(0.5, 1.0, 1.5),
        });

        model
    }

    #[test]
    fn packed_model_reads_back_unchanged() {
        let model = sample_model();
        let bytes = write_model(&model).unwrap();
        assert_eq!(read_model(&bytes).unwrap(), model);
    }

    #[test]
    fn header_lists_root_first_and_contiguous_chunks() {
        let model = sample_model();
        let bytes = write_model(&model).unwrap();

        let (header, data) = read_header(&bytes).unwrap();
        let data_len = data.len() as u64;

        assert_eq!(
            header.node_hierarchy,
            vec![
                header::HierarchyEntry::Node(model.nodes[0].id),
                header::HierarchyEntry::Node(model.nodes[0].id),
                header::HierarchyEntry::Children(vec![model.nodes[1].id]),
            ]
        );
        assert_eq!(header.animations.len(), 1);
        assert_eq!(header.meshes_data[0].meshes[0].bones.len(), 1);

        let mut expected_offset = 0;
        for triple in header.data_chunks_desc.chunks_exact(3) {
            assert_eq!(triple[1], expected_offset);
            expected_offset += triple[2];
        }
        assert_eq!(expected_offset, data_len);
    }

    #[test]
    fn animations_are_omitted_when_there_are_none() {
        let mut model = sample_model();
        model.animations.clear();
        let bytes = write_model(&model).unwrap();

        let json: serde_json::Value = serde_json::Deserializer::from_slice(&bytes)
            .into_iter()
            .next()
            .unwrap()
            .unwrap();
        assert!(json.get("animations").is_none());
        assert!(json.get("collisionSpheres").is_none());
        assert!(json.get("collisionBoxes").is_some());
    }

    #[test]
    fn missing_chunk_is_reported() {
        let model = sample_model();
        let bytes = write_model(&model).unwrap();

        let (mut header, data) = read_header(&bytes).unwrap();
        let chunks = data.to_vec();
        let last = header.data_chunks_desc.len() - 3;
        header.data_chunks_desc.truncate(last);

        let mut truncated = serde_json::to_vec(&header).unwrap();
        truncated.extend_from_slice(&chunks);
        assert!(matches!(
            read_model(&truncated),
            Err(PackingError::MissingChunk(_))
        ));
    }

    #[test]
    fn model_without_root_is_rejected() {
        assert!(matches!(
            write_model(&Model::new()),
            Err(PackingError::Malformed(_))
        ));
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.mdl");

        let model = sample_model();
        write_model_to_file(&model, &path).unwrap();
        assert_eq!(read_model_from_file(&path).unwrap(), model);
    }
}
