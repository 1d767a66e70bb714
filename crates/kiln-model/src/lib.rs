//! In-memory model produced by the importer and consumed by the packer.
//!
//! Nodes, meshes, mesh data and materials live in arenas owned by [`Model`] and refer to each other by
//! arena index. Ids are only used on disk.

mod collision;
pub mod material;
mod mesh;
mod parameter;

pub use collision::*;
pub use kiln_transform::Transform;
pub use material::Material;
pub use mesh::*;
pub use parameter::*;

pub const SCALING: &str = "scaling";
pub const ROTATION: &str = "rotation";
pub const TRANSLATION: &str = "translation";
pub const BONE_LENGTH: &str = "boneLength";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshAttachment {
    pub mesh: usize,
    pub material: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: u32,
    pub name: String,
    pub params: ParameterBlock,
    pub children: Vec<usize>,
    pub meshes: Vec<MeshAttachment>,
}

/// One animation clip, `name` is the curve name used on every animated parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationInfo {
    pub name: String,
    pub start_time: f32,
    pub duration: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub root_node: Option<usize>,
    pub nodes: Vec<Node>,
    pub meshes: Vec<Mesh>,
    pub mesh_data: Vec<MeshData>,
    pub materials: Vec<Material>,
    pub animations: Vec<AnimationInfo>,
    pub collision: CollisionShapes,
    next_id: u32,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out ids shared by nodes, meshes and materials, counting up from zero.
    pub fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Makes sure ids handed out from now on are above `id`.
    pub fn reserve_id(&mut self, id: u32) {
        self.next_id = self.next_id.max(id + 1);
    }

    pub fn add_node(&mut self, name: &str) -> usize {
        let id = self.allocate_id();
        self.nodes.push(Node {
            id,
            name: name.to_owned(),
            params: ParameterBlock::new(),
            children: Vec::new(),
            meshes: Vec::new(),
        });
        self.nodes.len() - 1
    }

    pub fn add_material(&mut self, name: &str) -> usize {
        let id = self.allocate_id();
        self.materials.push(Material {
            id,
            name: name.to_owned(),
            params: ParameterBlock::new(),
        });
        self.materials.len() - 1
    }

    pub fn add_mesh_data(&mut self) -> usize {
        self.mesh_data.push(MeshData::default());
        self.mesh_data.len() - 1
    }

    pub fn root(&self) -> Option<&Node> {
        self.root_node.and_then(|index| self.nodes.get(index))
    }

    pub fn node_by_id(&self, id: u32) -> Option<usize> {
        self.nodes.iter().position(|node| node.id == id)
    }

    pub fn node_by_name(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.name == name)
    }

    pub fn mesh_by_id(&self, id: u32) -> Option<usize> {
        self.meshes.iter().position(|mesh| mesh.id == id)
    }

    pub fn material_by_id(&self, id: u32) -> Option<usize> {
        self.materials.iter().position(|material| material.id == id)
    }

    /// Meshes stored in the mesh data at `mesh_data`, in mesh order.
    pub fn meshes_in(&self, mesh_data: usize) -> impl Iterator<Item = (usize, &Mesh)> {
        self.meshes
            .iter()
            .enumerate()
            .filter(move |(_, mesh)| mesh.mesh_data == mesh_data)
    }

    /// Parent of every node, `None` for the root and for nodes nobody points at.
    pub fn parents(&self) -> Vec<Option<usize>> {
        let mut parents = vec![None; self.nodes.len()];
        for (index, node) in self.nodes.iter().enumerate() {
            for child in &node.children {
                if let Some(parent) = parents.get_mut(*child) {
                    *parent = Some(index);
                }
            }
        }
        parents
    }

    /// `true` if the nodes form one tree below `root_node`: every other node has exactly one
    /// parent and every node is reachable without revisiting any.
    pub fn is_tree(&self) -> bool {
        let Some(root) = self.root_node else {
            return self.nodes.is_empty();
        };

        let mut parent_count = vec![0usize; self.nodes.len()];
        for node in &self.nodes {
            for child in &node.children {
                match parent_count.get_mut(*child) {
                    Some(count) => *count += 1,
                    None => return false,
                }
            }
        }
        if root >= self.nodes.len() || parent_count[root] != 0 {
            return false;
        }
        if parent_count
            .iter()
            .enumerate()
            .any(|(index, count)| index != root && *count != 1)
        {
            return false;
        }

        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![root];
        while let Some(index) = stack.pop() {
            if std::mem::replace(&mut visited[index], true) {
                return false;
            }
            stack.extend(self.nodes[index].children.iter().copied());
        }
        visited.into_iter().all(|visited| visited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(names: &[&str]) -> Model {
        let mut model = Model::new();
        let nodes = names
            .iter()
            .map(|name| model.add_node(name))
            .collect::<Vec<_>>();
        for pair in nodes.windows(2) {
            model.nodes[pair[0]].children.push(pair[1]);
        }
        model.root_node = nodes.first().copied();
        model
    }

    #[test]
    fn ids_increase_across_entity_kinds() {
        let mut model = Model::new();
        let node = model.add_node("root");
        let material = model.add_material("mat");
        let id = model.allocate_id();

        assert_eq!(model.nodes[node].id, 0);
        assert_eq!(model.materials[material].id, 1);
        assert_eq!(id, 2);

        model.reserve_id(10);
        assert_eq!(model.allocate_id(), 11);
    }

    #[test]
    fn tree_check_accepts_chains() {
        let model = chain(&["a", "b", "c"]);
        assert!(model.is_tree());
        assert_eq!(model.parents(), vec![None, Some(0), Some(1)]);
    }

    #[test]
    fn tree_check_rejects_cycles_and_shared_children() {
        let mut cyclic = chain(&["a", "b", "c"]);
        cyclic.nodes[2].children.push(1);
        assert!(!cyclic.is_tree());

        let mut shared = chain(&["a", "b", "c"]);
        shared.nodes[0].children.push(2);
        assert!(!shared.is_tree());

        let mut orphan = chain(&["a", "b"]);
        orphan.add_node("lost");
        assert!(!orphan.is_tree());
    }

    #[test]
    fn material_textures_are_string_parameters() {
        let mut model = Model::new();
        let material = model.add_material("brick");
        model.materials[material].set_texture(material::TEX_DIFFUSE, "textures/brick.png");

        assert_eq!(
            model.materials[material].texture(material::TEX_DIFFUSE),
            Some("textures/brick.png")
        );
        assert_eq!(model.materials[material].texture(material::TEX_NORMAL), None);
    }
}
