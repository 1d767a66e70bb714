use kiln_model::Model;

use crate::{ImportContext, ImportError};

/// Points every bone recorded during mesh conversion at its converted joint node.
pub fn resolve_bones(model: &mut Model, context: &ImportContext) -> Result<(), ImportError> {
    kiln_profiling::profile_function!();

    for (key, link) in &context.deferred_bones {
        let node = link.and_then(|link| context.nodes.get(&link).copied());
        let Some(mesh) = model.meshes.get_mut(key.mesh) else {
            continue;
        };

        match (node, mesh.bones.get_mut(key.bone)) {
            (Some(node), Some(bone)) => bone.node = Some(node),
            _ => {
                return Err(ImportError::MissingBoneNodeLink {
                    mesh: mesh.name.clone(),
                    bone: key.bone,
                })
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BoneKey, ImportSettings};
    use glam::Mat4;
    use kiln_model::{Aabb, Bone, Mesh, PrimitiveTopology};
    use kiln_scene::SourceNode;

    fn skinned_model() -> Model {
        let mut model = Model::new();
        model.add_node("joint");
        model.meshes.push(Mesh {
            id: 1,
            name: "body".to_owned(),
            mesh_data: 0,
            primitive_topology: PrimitiveTopology::TriangleList,
            vertex_decl: Vec::new(),
            stride: 0,
            vb_byte_offset: 0,
            num_vertices: 0,
            ib_byte_offset: 0,
            ib_format: None,
            num_elements: 0,
            aabb: Aabb::EMPTY,
            bones: vec![Bone::new(Mat4::IDENTITY)],
            material: None,
        });
        model
    }

    #[test]
    fn bones_point_at_converted_nodes() {
        let settings = ImportSettings::default();
        let mut context = ImportContext::new(&settings);
        context.nodes.insert(SourceNode(4), 0);
        context
            .deferred_bones
            .insert(BoneKey { mesh: 0, bone: 0 }, Some(SourceNode(4)));

        let mut model = skinned_model();
        resolve_bones(&mut model, &context).unwrap();
        assert_eq!(model.meshes[0].bones[0].node, Some(0));
    }

    #[test]
    fn unconverted_joint_fails() {
        let settings = ImportSettings::default();
        let mut context = ImportContext::new(&settings);
        context
            .deferred_bones
            .insert(BoneKey { mesh: 0, bone: 0 }, Some(SourceNode(4)));

        let mut model = skinned_model();
        assert_eq!(
            resolve_bones(&mut model, &context),
            Err(ImportError::MissingBoneNodeLink {
                mesh: "body".to_owned(),
                bone: 0,
            })
        );
    }
}
