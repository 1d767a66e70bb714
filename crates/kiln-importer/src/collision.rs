use std::collections::BTreeMap;

use glam::Vec3;
use kiln_model::{
    Aabb, CollisionBox, CollisionCapsule, CollisionCylinder, CollisionMesh, CollisionSphere, Model,
};
use kiln_scene::{SceneSource, SourceMesh};
use kiln_transform::Transform;

use crate::{error::CollisionDefect, ImportContext};

/// Kind of collision proxy a node stands for, decided by its name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollisionKind {
    Convex,
    Concave,
    Box,
    Capsule,
    Cylinder,
    Sphere,
}

impl CollisionKind {
    const PREFIXES: [(&'static str, CollisionKind); 6] = [
        ("SCConcave_", CollisionKind::Concave),
        ("SCConvex_", CollisionKind::Convex),
        ("SCBox_", CollisionKind::Box),
        ("SCCapsule_", CollisionKind::Capsule),
        ("SCCylinder_", CollisionKind::Cylinder),
        ("SCSphere_", CollisionKind::Sphere),
    ];

    /// `None` for nodes whose meshes are meant for rendering.
    pub fn classify(node_name: &str) -> Option<Self> {
        Self::PREFIXES
            .iter()
            .find(|(prefix, _)| node_name.starts_with(prefix))
            .map(|(_, kind)| *kind)
    }
}

/// One node that instances a collision mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionInstance {
    pub name: String,
    /// Global bind-pose transform of the node.
    pub transform: Transform,
}

/// Collision instances gathered while walking the node tree, grouped by kind and source mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollisionBuckets {
    instances: BTreeMap<(CollisionKind, SourceMesh), Vec<CollisionInstance>>,
}

impl CollisionBuckets {
    pub fn push(&mut self, kind: CollisionKind, mesh: SourceMesh, instance: CollisionInstance) {
        self.instances.entry((kind, mesh)).or_default().push(instance);
    }

    pub fn iter(&self) -> impl Iterator<Item = (CollisionKind, SourceMesh, &[CollisionInstance])> {
        self.instances
            .iter()
            .map(|((kind, mesh), instances)| (*kind, *mesh, instances.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.instances.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

/// Welds the corners of every polygon by position.
pub fn weld_positions<S: SceneSource + ?Sized>(
    scene: &S,
    mesh: SourceMesh,
) -> Result<(Vec<Vec3>, Vec<u32>), CollisionDefect> {
    let control_points = scene.control_points(mesh);
    let mut vertices: Vec<Vec3> = Vec::new();
    let mut indices = Vec::new();

    for polygon in 0..scene.polygon_count(mesh) {
        for corner in 0..scene.polygon_size(mesh, polygon) {
            let control_point = scene.polygon_vertex(mesh, polygon, corner) as usize;
            let position = control_points.get(control_point).copied().ok_or_else(|| {
                CollisionDefect::MissingControlPoint {
                    mesh: scene.mesh_name(mesh).to_owned(),
                    control_point,
                }
            })?;

            let index = match vertices.iter().position(|vertex| *vertex == position) {
                Some(index) => index,
                None => {
                    vertices.push(position);
                    vertices.len() - 1
                }
            };
            indices.push(index as u32);
        }
    }

    Ok((vertices, indices))
}

/// Half-extents of a capsule fitted into a box: `(half_height, radius)`, `half_height` excluding the caps.
pub fn capsule_extents(half_diagonal: Vec3) -> (f32, f32) {
    let mut sides = half_diagonal.to_array();
    sides.sort_by(f32::total_cmp);

    let half_height = sides[0];
    let radius = sides[1].max(sides[2]);
    if 2.0 * radius <= half_height {
        log::error!("Invalid capsule bounding box {:?}", half_diagonal);
    }
    (half_height - radius, radius)
}

/// Turns the gathered collision instances into collision shapes on `model`.
///
/// Every instance is placed with `context.collision_correction * instance.transform`.
pub fn build_collision<S: SceneSource + ?Sized>(
    scene: &S,
    model: &mut Model,
    context: &ImportContext,
) {
    kiln_profiling::profile_function!();
    log::info!("Extracting collision data...");

    let correction = context.collision_correction;
    let shapes = &mut model.collision;

    for (kind, mesh, instances) in context.collision.iter() {
        let aabb = Aabb::from_points(scene.control_points(mesh));

        match kind {
            CollisionKind::Convex | CollisionKind::Concave => {
                let (vertices, indices) = match weld_positions(scene, mesh) {
                    Ok((_, indices)) if indices.len() % 3 != 0 => {
                        let defect = CollisionDefect::InvalidCollisionGeometry {
                            mesh: scene.mesh_name(mesh).to_owned(),
                            index_count: indices.len(),
                        };
                        log::error!("{}", defect);
                        continue;
                    }
                    Ok(welded) => welded,
                    Err(defect) => {
                        log::error!("{}", defect);
                        continue;
                    }
                };

                for instance in instances {
                    let matrix = correction.get_matrix() * instance.transform.get_matrix();
                    let hull = CollisionMesh {
                        name: instance.name.clone(),
                        vertices: vertices.iter().map(|v| matrix.transform_point3(*v)).collect(),
                        indices: indices.clone(),
                    };
                    if kind == CollisionKind::Convex {
                        shapes.convex_hulls.push(hull);
                    } else {
                        shapes.concave_hulls.push(hull);
                    }
                }
            }
            CollisionKind::Box => {
                for instance in instances {
                    shapes.boxes.push(CollisionBox {
                        name: instance.name.clone(),
                        transform: centered(correction * instance.transform, &aabb),
                        half_diagonal: aabb.half_diagonal(),
                    });
                }
            }
            CollisionKind::Capsule => {
                let (half_height, radius) = capsule_extents(aabb.half_diagonal());
                for instance in instances {
                    shapes.capsules.push(CollisionCapsule {
                        name: instance.name.clone(),
                        transform: centered(correction * instance.transform, &aabb),
                        half_height,
                        radius,
                    });
                }
            }
            CollisionKind::Cylinder => {
                for instance in instances {
                    shapes.cylinders.push(CollisionCylinder {
                        name: instance.name.clone(),
                        transform: correction * instance.transform,
                        half_diagonal: aabb.half_diagonal(),
                    });
                }
            }
            CollisionKind::Sphere => {
                let radius = aabb.half_diagonal().min_element();
                for instance in instances {
                    shapes.spheres.push(CollisionSphere {
                        name: instance.name.clone(),
                        transform: correction * instance.transform,
                        radius,
                    });
                }
            }
        }
    }

    log::info!("Extracted {} collision shapes", shapes.len());
}

// The box center is added in model space, primitives are expected to be authored around the origin.
fn centered(mut transform: Transform, aabb: &Aabb) -> Transform {
    transform.translation += aabb.center();
    transform
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ImportSettings;
    use kiln_scene::{MemoryMesh, MemoryScene};

    fn cube(min: Vec3, max: Vec3) -> MemoryMesh {
        let points = (0..8)
            .map(|i| {
                Vec3::new(
                    if i & 1 == 0 { min.x } else { max.x },
                    if i & 2 == 0 { min.y } else { max.y },
                    if i & 4 == 0 { min.z } else { max.z },
                )
            })
            .collect();
        MemoryMesh::from_triangles("cube", points, &[0, 1, 3, 0, 3, 2, 4, 5, 7, 4, 7, 6])
    }

    fn instance(name: &str, translation: Vec3) -> CollisionInstance {
        CollisionInstance {
            name: name.to_owned(),
            transform: Transform::from_translation(translation),
        }
    }

    #[test]
    fn classify_uses_name_prefixes() {
        assert_eq!(CollisionKind::classify("SCBox_crate"), Some(CollisionKind::Box));
        assert_eq!(CollisionKind::classify("SCConcave_floor"), Some(CollisionKind::Concave));
        assert_eq!(CollisionKind::classify("SCSphere_"), Some(CollisionKind::Sphere));
        assert_eq!(CollisionKind::classify("crate_SCBox_"), None);
        assert_eq!(CollisionKind::classify("scbox_crate"), None);
    }

    #[test]
    fn capsule_uses_smallest_side_as_half_height() {
        let (half_height, radius) = capsule_extents(Vec3::new(0.5, 2.0, 0.5));
        assert_eq!(radius, 2.0);
        assert_eq!(half_height, 0.5 - 2.0);

        let (half_height, radius) = capsule_extents(Vec3::new(3.0, 1.0, 1.0));
        assert_eq!((half_height, radius), (-2.0, 3.0));
    }

    #[test]
    fn shapes_follow_their_instances() {
        let mut scene = MemoryScene::new();
        let mesh = scene.add_mesh(cube(Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 4.0, 6.0)));

        let settings = ImportSettings::default();
        let mut context = ImportContext::new(&settings);
        context.collision_correction = Transform::from_translation(Vec3::new(0.0, -1.0, 0.0));
        context.collision.push(CollisionKind::Box, mesh, instance("SCBox_a", Vec3::X));
        context.collision.push(CollisionKind::Box, mesh, instance("SCBox_b", Vec3::Z));
        context.collision.push(CollisionKind::Sphere, mesh, instance("SCSphere_a", Vec3::ZERO));
        context.collision.push(CollisionKind::Cylinder, mesh, instance("SCCylinder_a", Vec3::ZERO));
        context.collision.push(CollisionKind::Convex, mesh, instance("SCConvex_a", Vec3::Y));

        let mut model = Model::new();
        build_collision(&scene, &mut model, &context);
        let shapes = &model.collision;

        assert_eq!(shapes.len(), 5);
        assert_eq!(shapes.boxes[0].name, "SCBox_a");
        assert_eq!(shapes.boxes[0].half_diagonal, Vec3::new(1.0, 2.0, 3.0));
        assert!(shapes.boxes[0]
            .transform
            .translation
            .abs_diff_eq(Vec3::new(2.0, 1.0, 3.0), 1e-6));
        assert!(shapes.boxes[1]
            .transform
            .translation
            .abs_diff_eq(Vec3::new(1.0, 1.0, 4.0), 1e-6));

        assert_eq!(shapes.spheres[0].radius, 1.0);
        assert!(shapes.spheres[0]
            .transform
            .translation
            .abs_diff_eq(Vec3::new(0.0, -1.0, 0.0), 1e-6));
        assert_eq!(shapes.cylinders[0].half_diagonal, Vec3::new(1.0, 2.0, 3.0));

        let hull = &shapes.convex_hulls[0];
        assert_eq!(hull.vertices.len(), 8);
        assert_eq!(hull.indices.len(), 12);
        assert!(hull.vertices[0].abs_diff_eq(Vec3::ZERO, 1e-6));
    }

    #[test]
    fn non_triangle_hull_is_skipped() {
        let mut scene = MemoryScene::new();
        let mesh = scene.add_mesh(MemoryMesh::new(
            "quad",
            vec![Vec3::ZERO, Vec3::X, Vec3::ONE, Vec3::Y],
            vec![vec![0, 1, 2, 3]],
        ));

        let settings = ImportSettings::default();
        let mut context = ImportContext::new(&settings);
        context.collision.push(CollisionKind::Concave, mesh, instance("SCConcave_q", Vec3::ZERO));

        let mut model = Model::new();
        build_collision(&scene, &mut model, &context);
        assert!(model.collision.is_empty());
    }

    #[test]
    fn hull_with_missing_control_point_is_skipped() {
        let mut scene = MemoryScene::new();
        let mesh = scene.add_mesh(MemoryMesh::from_triangles(
            "broken",
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            &[0, 1, 2, 0, 2, 7],
        ));

        assert_eq!(
            weld_positions(&scene, mesh),
            Err(CollisionDefect::MissingControlPoint {
                mesh: "broken".to_owned(),
                control_point: 7,
            })
        );

        let settings = ImportSettings::default();
        let mut context = ImportContext::new(&settings);
        context.collision.push(CollisionKind::Convex, mesh, instance("SCConvex_b", Vec3::ZERO));
        context.collision.push(CollisionKind::Box, mesh, instance("SCBox_b", Vec3::ZERO));

        let mut model = Model::new();
        build_collision(&scene, &mut model, &context);
        assert!(model.collision.convex_hulls.is_empty());
        assert_eq!(model.collision.boxes.len(), 1);
    }
}
