use glam::Vec3;
use kiln_transform::Transform;

/// Triangle soup already in model space.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionMesh {
    pub name: String,
    pub vertices: Vec<Vec3>,
    pub indices: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollisionBox {
    pub name: String,
    pub transform: Transform,
    pub half_diagonal: Vec3,
}

/// Capsule along its local axis, `half_height` excludes the caps.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionCapsule {
    pub name: String,
    pub transform: Transform,
    pub half_height: f32,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollisionCylinder {
    pub name: String,
    pub transform: Transform,
    pub half_diagonal: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollisionSphere {
    pub name: String,
    pub transform: Transform,
    pub radius: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollisionShapes {
    pub convex_hulls: Vec<CollisionMesh>,
    pub concave_hulls: Vec<CollisionMesh>,
    pub boxes: Vec<CollisionBox>,
    pub capsules: Vec<CollisionCapsule>,
    pub cylinders: Vec<CollisionCylinder>,
    pub spheres: Vec<CollisionSphere>,
}

impl CollisionShapes {
    pub fn len(&self) -> usize {
        self.convex_hulls.len()
            + self.concave_hulls.len()
            + self.boxes.len()
            + self.capsules.len()
            + self.cylinders.len()
            + self.spheres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
