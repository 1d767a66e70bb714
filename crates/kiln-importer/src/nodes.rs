use std::collections::BTreeSet;

use kiln_model::{
    MeshAttachment, Model, ParameterValue, BONE_LENGTH, ROTATION, SCALING, TRANSLATION,
};
use kiln_scene::{NodeAttribute, SceneSource, SourceNode};

use crate::{
    collision::{CollisionInstance, CollisionKind},
    ImportContext, ImportError,
};

/// Skeleton sizes are authored in centimetres.
const LIMB_SIZE_UNITS: f32 = 100.0;

/// Builds the node tree below `root` and makes it the model root.
///
/// Without a root override every node that is not reachable from the scene root and has no parent
/// of its own is converted as an extra child of the root.
pub fn build_node_hierarchy<S: SceneSource + ?Sized>(
    scene: &S,
    root_override: Option<SourceNode>,
    model: &mut Model,
    context: &mut ImportContext,
) -> Result<(), ImportError> {
    kiln_profiling::profile_function!();
    log::info!("Parsing nodes...");

    let root = root_override.unwrap_or_else(|| scene.root_node());
    let root_index = build_node(scene, root, model, context)?;
    model.root_node = Some(root_index);

    if root_override.is_none() {
        let has_parent = (0..scene.node_count())
            .flat_map(|node| scene.node_children(SourceNode(node)).iter().copied())
            .collect::<BTreeSet<_>>();

        for node in (0..scene.node_count()).map(SourceNode) {
            if context.nodes.contains_key(&node) || has_parent.contains(&node) {
                continue;
            }

            log::warn!(
                "Found parentless node {}. Attaching it to root...",
                scene.node_name(node)
            );
            let orphan = build_node(scene, node, model, context)?;
            model.nodes[root_index].children.push(orphan);
        }

        let unreachable = (0..scene.node_count())
            .filter(|node| !context.nodes.contains_key(&SourceNode(*node)))
            .count();
        if unreachable > 0 {
            log::warn!("{} nodes are part of a cycle and were not converted", unreachable);
        }
    }

    Ok(())
}

fn build_node<S: SceneSource + ?Sized>(
    scene: &S,
    source: SourceNode,
    model: &mut Model,
    context: &mut ImportContext,
) -> Result<usize, ImportError> {
    let name = scene.node_name(source);
    log::debug!("Parsing node {} ...", name);

    let node = model.add_node(name);
    context.nodes.insert(source, node);

    let local = scene.evaluate_local_transform(source, None);
    let rotation = local
        .rotation_quat()
        .ok_or_else(|| ImportError::UnsupportedRotationOrder {
            node: name.to_owned(),
            order: local.rotation_order,
        })?;

    let params = &mut model.nodes[node].params;
    params.find_or_create(SCALING, ParameterValue::Float3(local.scaling));
    params.find_or_create(ROTATION, ParameterValue::Quaternion(rotation));
    params.find_or_create(TRANSLATION, ParameterValue::Float3(local.translation));

    for (slot, attribute) in scene.node_attributes(source).iter().enumerate() {
        match *attribute {
            NodeAttribute::Skeleton { size } => {
                let length = ParameterValue::Float(size / LIMB_SIZE_UNITS);
                model.nodes[node]
                    .params
                    .find_or_create(BONE_LENGTH, length.clone())
                    .set_static_value(length);
            }
            NodeAttribute::Mesh(mesh) => {
                if let Some(kind) = CollisionKind::classify(name) {
                    let global = scene.evaluate_global_transform(source, None);
                    let transform =
                        global
                            .to_transform()
                            .ok_or_else(|| ImportError::UnsupportedRotationOrder {
                                node: name.to_owned(),
                                order: global.rotation_order,
                            })?;
                    context.collision.push(
                        kind,
                        mesh,
                        CollisionInstance {
                            name: name.to_owned(),
                            transform,
                        },
                    );
                    continue;
                }

                let Some(mesh_index) = context.meshes.get(&mesh).copied() else {
                    log::warn!(
                        "Node '{}' instances mesh '{}' which was not converted",
                        name,
                        scene.mesh_name(mesh)
                    );
                    continue;
                };

                let source_material = scene.node_material(source, slot);
                let material = source_material.and_then(|m| context.materials.get(&m).copied());
                if let (Some(source_material), None) = (source_material, material) {
                    log::warn!(
                        "A material '{}' to mesh '{}' should be attached, but isn't found! No material is going to be applied!",
                        scene.material_name(source_material),
                        scene.mesh_name(mesh)
                    );
                }

                model.nodes[node].meshes.push(MeshAttachment {
                    mesh: mesh_index,
                    material,
                });
            }
            NodeAttribute::Other => {}
        }
    }

    for child in scene.node_children(source) {
        if context.nodes.contains_key(child) {
            log::warn!(
                "Node '{}' is reachable more than once, keeping its first parent",
                scene.node_name(*child)
            );
            continue;
        }

        let child = build_node(scene, *child, model, context)?;
        model.nodes[node].children.push(child);
    }

    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{material::convert_materials, mesh::convert_meshes, ImportSettings};
    use glam::{Quat, Vec3};
    use kiln_scene::{MemoryMesh, MemoryScene, SourceTransform};
    use kiln_transform::{RotationOrder, Transform};

    fn build(scene: &MemoryScene, root_override: Option<SourceNode>) -> Result<Model, ImportError> {
        let settings = ImportSettings::default();
        let mut model = Model::new();
        let mut context = ImportContext::new(&settings);
        convert_materials(scene, &mut model, &mut context);
        convert_meshes(scene, &mut model, &mut context)?;
        build_node_hierarchy(scene, root_override, &mut model, &mut context)?;
        Ok(model)
    }

    #[test]
    fn hierarchy_mirrors_the_scene() {
        let mut scene = MemoryScene::new();
        let root = scene.root_node();
        let hips = scene.add_node("hips", Some(root), &Transform::from_translation(Vec3::Y));
        let spine = scene.add_node("spine", Some(hips), &Transform::IDENTITY);
        scene.add_node("leg", Some(hips), &Transform::from_rotation(Quat::from_rotation_z(0.5)));
        scene.attach_skeleton(spine, 250.0);

        let model = build(&scene, None).unwrap();

        assert!(model.is_tree());
        let root = model.root().unwrap();
        assert_eq!(root.name, "RootNode");
        let hips = &model.nodes[root.children[0]];
        assert_eq!(hips.children.len(), 2);
        assert_eq!(
            hips.params.get(TRANSLATION).map(|p| p.static_value()),
            Some(&ParameterValue::Float3(Vec3::Y))
        );
        let spine = &model.nodes[hips.children[0]];
        assert_eq!(
            spine.params.get(BONE_LENGTH).map(|p| p.static_value()),
            Some(&ParameterValue::Float(2.5))
        );

        let leg = &model.nodes[hips.children[1]];
        match leg.params.get(ROTATION).map(|p| p.static_value()) {
            Some(ParameterValue::Quaternion(rotation)) => {
                assert!(rotation.dot(Quat::from_rotation_z(0.5)).abs() > 0.9999)
            }
            other => panic!("unexpected rotation {:?}", other),
        }
    }

    #[test]
    fn parentless_nodes_are_attached_to_the_root() {
        let mut scene = MemoryScene::new();
        let lost = scene.add_node("lost", None, &Transform::IDENTITY);
        scene.add_node("lost_child", Some(lost), &Transform::IDENTITY);

        let model = build(&scene, None).unwrap();

        assert!(model.is_tree());
        assert_eq!(model.nodes.len(), 3);
        let root = model.root().unwrap();
        assert_eq!(model.nodes[root.children[0]].name, "lost");
    }

    #[test]
    fn root_override_skips_the_rest_of_the_scene() {
        let mut scene = MemoryScene::new();
        let root = scene.root_node();
        let a = scene.add_node("a", Some(root), &Transform::IDENTITY);
        scene.add_node("b", Some(a), &Transform::IDENTITY);
        scene.add_node("c", Some(root), &Transform::IDENTITY);

        let model = build(&scene, Some(a)).unwrap();

        assert_eq!(model.nodes.len(), 2);
        assert_eq!(model.root().map(|node| node.name.as_str()), Some("a"));
    }

    #[test]
    fn spheric_rotation_order_fails() {
        let mut scene = MemoryScene::new();
        let root = scene.root_node();
        let node = scene.add_node("odd", Some(root), &Transform::IDENTITY);
        scene.set_local_transform(
            node,
            SourceTransform {
                rotation_order: RotationOrder::SphericXyz,
                ..Default::default()
            },
        );

        assert_eq!(
            build(&scene, None),
            Err(ImportError::UnsupportedRotationOrder {
                node: "odd".to_owned(),
                order: RotationOrder::SphericXyz,
            })
        );
    }

    #[test]
    fn unconverted_mesh_is_left_out() {
        let mut scene = MemoryScene::new();
        let root = scene.root_node();
        let quad = scene.add_mesh(MemoryMesh::new(
            "quad",
            vec![Vec3::ZERO, Vec3::X, Vec3::ONE, Vec3::Y],
            vec![vec![0, 1, 2, 3]],
        ));
        let tri = scene.add_mesh(MemoryMesh::from_triangles(
            "tri",
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            &[0, 1, 2],
        ));
        let node = scene.add_node("mixed", Some(root), &Transform::IDENTITY);
        scene.attach_mesh(node, quad, None);
        scene.attach_mesh(node, tri, None);

        let model = build(&scene, None).unwrap();

        let node = &model.nodes[model.node_by_name("mixed").unwrap()];
        assert_eq!(
            node.meshes,
            vec![MeshAttachment {
                mesh: 0,
                material: None
            }]
        );
        assert_eq!(model.meshes[0].name, "tri");
    }

    #[test]
    fn collision_nodes_do_not_render_their_mesh() {
        let mut scene = MemoryScene::new();
        let root = scene.root_node();
        let mesh = scene.add_mesh(MemoryMesh::from_triangles(
            "tri",
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            &[0, 1, 2],
        ));
        let material = scene.add_material("mat");
        let visual = scene.add_node("visual", Some(root), &Transform::IDENTITY);
        let proxy = scene.add_node(
            "SCConvex_proxy",
            Some(root),
            &Transform::from_translation(Vec3::X),
        );
        scene.attach_mesh(visual, mesh, Some(material));
        scene.attach_mesh(proxy, mesh, None);

        let settings = ImportSettings::default();
        let mut model = Model::new();
        let mut context = ImportContext::new(&settings);
        convert_materials(&scene, &mut model, &mut context);
        convert_meshes(&scene, &mut model, &mut context).unwrap();
        build_node_hierarchy(&scene, None, &mut model, &mut context).unwrap();

        let visual = &model.nodes[model.node_by_name("visual").unwrap()];
        assert_eq!(
            visual.meshes,
            vec![MeshAttachment {
                mesh: 0,
                material: Some(0)
            }]
        );
        let proxy = &model.nodes[model.node_by_name("SCConvex_proxy").unwrap()];
        assert!(proxy.meshes.is_empty());

        let (kind, _, instances) = context.collision.iter().next().unwrap();
        assert_eq!(kind, CollisionKind::Convex);
        assert_eq!(instances[0].name, "SCConvex_proxy");
        assert!(instances[0].transform.translation.abs_diff_eq(Vec3::X, 1e-6));
    }
}
