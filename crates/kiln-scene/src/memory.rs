use std::collections::BTreeMap;

use glam::{Mat4, Quat, Vec3};
use kiln_transform::{euler_degrees_from_quat, Transform};

use crate::{
    AnimationSample, AnimationStack, ChannelKind, Deformer, MaterialProperty, NodeAttribute,
    SceneSource, SourceLayer, SourceMaterial, SourceMesh, SourceNode, SourceTransform,
    TransformChannel, VertexChannel,
};

pub const ROOT_NODE_NAME: &str = "RootNode";

/// Keys of one animated channel, sorted by time.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyframes<T> {
    pub times: Vec<f32>,
    pub values: Vec<T>,
}

impl<T: Copy> Keyframes<T> {
    pub fn new(times: Vec<f32>, values: Vec<T>) -> Self {
        debug_assert_eq!(times.len(), values.len());
        Self { times, values }
    }

    /// Samples with clamping outside the key range. `None` for an empty curve.
    pub fn sample_with(&self, time: f32, interpolate: impl Fn(T, T, f32) -> T) -> Option<T> {
        let last = self.times.len().min(self.values.len()).checked_sub(1)?;
        if time <= self.times[0] {
            return Some(self.values[0]);
        }
        if time >= self.times[last] {
            return Some(self.values[last]);
        }

        let next = self.times.partition_point(|key| *key <= time);
        let prev = next - 1;
        let span = self.times[next] - self.times[prev];
        let t = if span > 0.0 {
            (time - self.times[prev]) / span
        } else {
            0.0
        };
        Some(interpolate(self.values[prev], self.values[next], t))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub translation: Option<Keyframes<Vec3>>,
    pub rotation: Option<Keyframes<Quat>>,
    pub scaling: Option<Keyframes<Vec3>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryNode {
    pub name: String,
    pub parent: Option<SourceNode>,
    pub children: Vec<SourceNode>,
    pub local: SourceTransform,
    pub attributes: Vec<NodeAttribute>,
    pub materials: Vec<Option<SourceMaterial>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryMesh {
    pub name: String,
    pub group: usize,
    pub control_points: Vec<Vec3>,
    pub polygons: Vec<Vec<u32>>,
    pub material_layers: usize,
    pub channels: BTreeMap<ChannelKind, VertexChannel>,
    pub deformers: Vec<Deformer>,
}

impl MemoryMesh {
    pub fn new(name: &str, control_points: Vec<Vec3>, polygons: Vec<Vec<u32>>) -> Self {
        Self {
            name: name.to_owned(),
            group: 0,
            control_points,
            polygons,
            material_layers: 1,
            channels: BTreeMap::new(),
            deformers: Vec::new(),
        }
    }

    /// Splits a flat index list into triangles.
    pub fn from_triangles(name: &str, control_points: Vec<Vec3>, indices: &[u32]) -> Self {
        let polygons = indices.chunks(3).map(<[u32]>::to_vec).collect();
        Self::new(name, control_points, polygons)
    }

    pub fn with_channel(mut self, kind: ChannelKind, channel: VertexChannel) -> Self {
        self.channels.insert(kind, channel);
        self
    }

    pub fn with_deformer(mut self, deformer: Deformer) -> Self {
        self.deformers.push(deformer);
        self
    }

    pub fn with_group(mut self, group: usize) -> Self {
        self.group = group;
        self
    }

    pub fn with_material_layers(mut self, material_layers: usize) -> Self {
        self.material_layers = material_layers;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryMaterial {
    pub name: String,
    pub properties: BTreeMap<String, MaterialProperty>,
}

/// An owned scene graph. Node 0 is always the root.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryScene {
    nodes: Vec<MemoryNode>,
    meshes: Vec<MemoryMesh>,
    materials: Vec<MemoryMaterial>,
    stacks: Vec<AnimationStack>,
    layer_count: usize,
    tracks: BTreeMap<(SourceNode, SourceLayer), Track>,
}

impl Default for MemoryScene {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryScene {
    pub fn new() -> Self {
        Self {
            nodes: vec![MemoryNode {
                name: ROOT_NODE_NAME.to_owned(),
                parent: None,
                children: Vec::new(),
                local: SourceTransform::default(),
                attributes: Vec::new(),
                materials: Vec::new(),
            }],
            meshes: Vec::new(),
            materials: Vec::new(),
            stacks: Vec::new(),
            layer_count: 0,
            tracks: BTreeMap::new(),
        }
    }

    /// Adds a node below `parent`. A node without parent stays disconnected from the root.
    pub fn add_node(
        &mut self,
        name: &str,
        parent: Option<SourceNode>,
        local: &Transform,
    ) -> SourceNode {
        let node = SourceNode(self.nodes.len());
        self.nodes.push(MemoryNode {
            name: name.to_owned(),
            parent: None,
            children: Vec::new(),
            local: SourceTransform::from_transform(local),
            attributes: Vec::new(),
            materials: Vec::new(),
        });

        if let Some(parent) = parent {
            self.add_child(parent, node);
        }
        node
    }

    /// Moves `child` under `parent`, detaching it from its previous parent.
    pub fn add_child(&mut self, parent: SourceNode, child: SourceNode) {
        if let Some(previous) = self.nodes[child.0].parent.take() {
            self.nodes[previous.0].children.retain(|c| *c != child);
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn node(&self, node: SourceNode) -> &MemoryNode {
        &self.nodes[node.0]
    }

    pub fn set_local_transform(&mut self, node: SourceNode, local: SourceTransform) {
        self.nodes[node.0].local = local;
    }

    pub fn add_material(&mut self, name: &str) -> SourceMaterial {
        self.materials.push(MemoryMaterial {
            name: name.to_owned(),
            properties: BTreeMap::new(),
        });
        SourceMaterial(self.materials.len() - 1)
    }

    pub fn set_material_property(
        &mut self,
        material: SourceMaterial,
        path: &str,
        property: MaterialProperty,
    ) {
        self.materials[material.0]
            .properties
            .insert(path.to_owned(), property);
    }

    pub fn add_mesh(&mut self, mesh: MemoryMesh) -> SourceMesh {
        self.meshes.push(mesh);
        SourceMesh(self.meshes.len() - 1)
    }

    pub fn mesh(&self, mesh: SourceMesh) -> &MemoryMesh {
        &self.meshes[mesh.0]
    }

    /// Instances `mesh` on `node`, binding `material` to the new attribute slot.
    pub fn attach_mesh(
        &mut self,
        node: SourceNode,
        mesh: SourceMesh,
        material: Option<SourceMaterial>,
    ) {
        let node = &mut self.nodes[node.0];
        let slot = node.attributes.len();
        node.attributes.push(NodeAttribute::Mesh(mesh));
        if node.materials.len() <= slot {
            node.materials.resize(slot + 1, None);
        }
        node.materials[slot] = material;
    }

    pub fn attach_skeleton(&mut self, node: SourceNode, size: f32) {
        self.nodes[node.0]
            .attributes
            .push(NodeAttribute::Skeleton { size });
    }

    /// Adds a stack with one layer and returns that layer.
    pub fn add_animation_stack(&mut self, name: &str, start: f32, stop: f32) -> SourceLayer {
        self.stacks.push(AnimationStack {
            name: name.to_owned(),
            start,
            stop,
            layers: Vec::new(),
        });
        self.add_layer(self.stacks.len() - 1)
    }

    pub fn add_layer(&mut self, stack: usize) -> SourceLayer {
        let layer = SourceLayer(self.layer_count);
        self.layer_count += 1;
        self.stacks[stack].layers.push(layer);
        layer
    }

    pub fn set_translation_keys(
        &mut self,
        node: SourceNode,
        layer: SourceLayer,
        keys: Keyframes<Vec3>,
    ) {
        self.tracks.entry((node, layer)).or_default().translation = Some(keys);
    }

    pub fn set_rotation_keys(
        &mut self,
        node: SourceNode,
        layer: SourceLayer,
        keys: Keyframes<Quat>,
    ) {
        self.tracks.entry((node, layer)).or_default().rotation = Some(keys);
    }

    pub fn set_scaling_keys(
        &mut self,
        node: SourceNode,
        layer: SourceLayer,
        keys: Keyframes<Vec3>,
    ) {
        self.tracks.entry((node, layer)).or_default().scaling = Some(keys);
    }

    fn local_matrix(&self, node: SourceNode, sample: Option<AnimationSample>) -> Mat4 {
        self.evaluate_local_transform(node, sample)
            .to_transform()
            .map(|transform| transform.get_matrix())
            .unwrap_or(Mat4::IDENTITY)
    }
}

impl SceneSource for MemoryScene {
    fn material_count(&self) -> usize {
        self.materials.len()
    }

    fn material_name(&self, material: SourceMaterial) -> &str {
        &self.materials[material.0].name
    }

    fn material_property(&self, material: SourceMaterial, path: &str) -> Option<&MaterialProperty> {
        self.materials[material.0].properties.get(path)
    }

    fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    fn mesh_name(&self, mesh: SourceMesh) -> &str {
        &self.meshes[mesh.0].name
    }

    fn mesh_group(&self, mesh: SourceMesh) -> usize {
        self.meshes[mesh.0].group
    }

    fn polygon_count(&self, mesh: SourceMesh) -> usize {
        self.meshes[mesh.0].polygons.len()
    }

    fn polygon_size(&self, mesh: SourceMesh, polygon: usize) -> usize {
        self.meshes[mesh.0].polygons[polygon].len()
    }

    fn polygon_vertex(&self, mesh: SourceMesh, polygon: usize, corner: usize) -> u32 {
        self.meshes[mesh.0].polygons[polygon][corner]
    }

    fn control_points(&self, mesh: SourceMesh) -> &[Vec3] {
        &self.meshes[mesh.0].control_points
    }

    fn material_layer_count(&self, mesh: SourceMesh) -> usize {
        self.meshes[mesh.0].material_layers
    }

    fn vertex_channel(&self, mesh: SourceMesh, kind: ChannelKind) -> Option<&VertexChannel> {
        self.meshes[mesh.0].channels.get(&kind)
    }

    fn deformers(&self, mesh: SourceMesh) -> &[Deformer] {
        &self.meshes[mesh.0].deformers
    }

    fn root_node(&self) -> SourceNode {
        SourceNode(0)
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn node_name(&self, node: SourceNode) -> &str {
        &self.nodes[node.0].name
    }

    fn node_children(&self, node: SourceNode) -> &[SourceNode] {
        &self.nodes[node.0].children
    }

    fn node_attributes(&self, node: SourceNode) -> &[NodeAttribute] {
        &self.nodes[node.0].attributes
    }

    fn node_material(&self, node: SourceNode, slot: usize) -> Option<SourceMaterial> {
        self.nodes[node.0].materials.get(slot).copied().flatten()
    }

    fn evaluate_local_transform(
        &self,
        node: SourceNode,
        sample: Option<AnimationSample>,
    ) -> SourceTransform {
        let mut local = self.nodes[node.0].local;
        let Some(sample) = sample else {
            return local;
        };
        let Some(stack) = self.stacks.get(sample.stack) else {
            return local;
        };

        for layer in &stack.layers {
            let Some(track) = self.tracks.get(&(node, *layer)) else {
                continue;
            };

            if let Some(translation) = track
                .translation
                .as_ref()
                .and_then(|keys| keys.sample_with(sample.time, Vec3::lerp))
            {
                local.translation = translation;
            }
            if let Some(rotation) = track
                .rotation
                .as_ref()
                .and_then(|keys| keys.sample_with(sample.time, Quat::slerp))
            {
                if let Some(degrees) = euler_degrees_from_quat(local.rotation_order, rotation) {
                    local.rotation = degrees;
                }
            }
            if let Some(scaling) = track
                .scaling
                .as_ref()
                .and_then(|keys| keys.sample_with(sample.time, Vec3::lerp))
            {
                local.scaling = scaling;
            }
        }

        local
    }

    fn evaluate_global_transform(
        &self,
        node: SourceNode,
        sample: Option<AnimationSample>,
    ) -> SourceTransform {
        let mut matrix = self.local_matrix(node, sample);
        let mut parent = self.nodes[node.0].parent;
        while let Some(current) = parent {
            matrix = self.local_matrix(current, sample) * matrix;
            parent = self.nodes[current.0].parent;
        }

        SourceTransform::from_matrix(matrix)
    }

    fn animation_stacks(&self) -> &[AnimationStack] {
        &self.stacks
    }

    fn curve_key_times(
        &self,
        node: SourceNode,
        layer: SourceLayer,
        channel: TransformChannel,
    ) -> Option<Vec<f32>> {
        let track = self.tracks.get(&(node, layer))?;
        match channel {
            TransformChannel::Translation => track.translation.as_ref().map(|k| k.times.clone()),
            TransformChannel::Rotation => track.rotation.as_ref().map(|k| k.times.clone()),
            TransformChannel::Scaling => track.scaling.as_ref().map(|k| k.times.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_transform_composes_parents() {
        let mut scene = MemoryScene::new();
        let root = scene.root_node();
        let parent = scene.add_node(
            "parent",
            Some(root),
            &Transform::from_translation(Vec3::new(0.0, 10.0, 0.0)),
        );
        let child = scene.add_node(
            "child",
            Some(parent),
            &Transform::from_translation(Vec3::new(1.0, 0.0, 0.0)),
        );

        let global = scene.evaluate_global_transform(child, None);
        assert!(global
            .translation
            .abs_diff_eq(Vec3::new(1.0, 10.0, 0.0), 1e-5));
        assert_eq!(scene.node_children(root), &[parent]);
    }

    #[test]
    fn disconnected_nodes_have_no_parent() {
        let mut scene = MemoryScene::new();
        let loose = scene.add_node("loose", None, &Transform::IDENTITY);

        assert!(scene.node(loose).parent.is_none());
        assert!(scene.node_children(scene.root_node()).is_empty());
        assert_eq!(scene.node_count(), 2);
    }

    #[test]
    fn animated_channels_override_bind_pose() {
        let mut scene = MemoryScene::new();
        let node = scene.add_node(
            "mover",
            Some(scene.root_node()),
            &Transform::from_scale(Vec3::splat(2.0)),
        );
        let layer = scene.add_animation_stack("walk", 0.0, 1.0);
        scene.set_translation_keys(
            node,
            layer,
            Keyframes::new(vec![0.0, 1.0], vec![Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0)]),
        );

        let sample = AnimationSample {
            stack: 0,
            time: 0.25,
        };
        let local = scene.evaluate_local_transform(node, Some(sample));
        assert!(local.translation.abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), 1e-5));
        assert!(local.scaling.abs_diff_eq(Vec3::splat(2.0), 1e-5));

        assert_eq!(
            scene.curve_key_times(node, layer, TransformChannel::Translation),
            Some(vec![0.0, 1.0])
        );
        assert_eq!(
            scene.curve_key_times(node, layer, TransformChannel::Rotation),
            None
        );
    }

    #[test]
    fn keyframes_clamp_outside_range() {
        let keys = Keyframes::new(vec![1.0, 2.0], vec![10.0f32, 20.0]);
        let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;

        assert_eq!(keys.sample_with(0.0, lerp), Some(10.0));
        assert_eq!(keys.sample_with(1.5, lerp), Some(15.0));
        assert_eq!(keys.sample_with(3.0, lerp), Some(20.0));
        assert_eq!(Keyframes::<f32>::new(vec![], vec![]).sample_with(0.0, lerp), None);
    }

    #[test]
    fn material_slots_follow_attribute_order() {
        let mut scene = MemoryScene::new();
        let node = scene.add_node("n", Some(scene.root_node()), &Transform::IDENTITY);
        let material = scene.add_material("m");
        let mesh = scene.add_mesh(MemoryMesh::from_triangles(
            "tri",
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            &[0, 1, 2],
        ));

        scene.attach_skeleton(node, 100.0);
        scene.attach_mesh(node, mesh, Some(material));

        assert_eq!(scene.node_material(node, 0), None);
        assert_eq!(scene.node_material(node, 1), Some(material));
        assert_eq!(scene.node_attributes(node)[1], NodeAttribute::Mesh(mesh));
    }
}
