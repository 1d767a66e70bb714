use kiln_model::{Bone, Mesh};
use kiln_scene::{Deformer, SceneSource, SourceMesh};

use crate::{BoneKey, ImportContext, ImportError};

/// Turns every skin cluster of `source` into a bone on `mesh`.
///
/// `control_point_vertices` lists the converted vertices of every control point. A weighted control
/// point that produced several vertices passes its weight to each of them. The joint node of each
/// bone is only recorded in the context here and resolved after the node tree exists.
pub fn bind_skin<S: SceneSource + ?Sized>(
    scene: &S,
    source: SourceMesh,
    mesh: &mut Mesh,
    mesh_index: usize,
    control_point_vertices: &[Vec<u32>],
    context: &mut ImportContext,
) -> Result<(), ImportError> {
    for deformer in scene.deformers(source) {
        let Deformer::Skin(clusters) = deformer else {
            continue;
        };

        for cluster in clusters {
            let mut bone = Bone::new(cluster.transform_link.inverse() * cluster.transform);

            for (control_point, weight) in cluster.control_points.iter().zip(&cluster.weights) {
                let vertices = control_point_vertices
                    .get(*control_point as usize)
                    .ok_or_else(|| ImportError::InvalidSkinBinding {
                        mesh: mesh.name.clone(),
                        control_point: *control_point,
                    })?;
                if vertices.is_empty() {
                    return Err(ImportError::UnboundSkinInfluence {
                        mesh: mesh.name.clone(),
                        control_point: *control_point,
                    });
                }

                for vertex in vertices {
                    bone.add_influence(*vertex, *weight);
                }
            }

            let key = BoneKey {
                mesh: mesh_index,
                bone: mesh.bones.len(),
            };
            context.deferred_bones.insert(key, cluster.link);
            mesh.bones.push(bone);
        }
    }

    if !mesh.bones.is_empty() {
        log::debug!("Mesh '{}' is skinned to {} bones", mesh.name, mesh.bones.len());
    }
    Ok(())
}
