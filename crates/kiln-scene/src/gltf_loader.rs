//! glTF 2.0 documents as [`MemoryScene`]s.
//!
//! Every primitive becomes its own source mesh, so each mesh carries a single material. Primitives
//! of one glTF mesh share a mesh group. The default scene's root nodes are parented to the
//! synthetic root, nodes outside of it stay disconnected.

use std::{
    collections::{BTreeSet, HashMap},
    path::Path,
};

use glam::{Mat4, Quat, Vec3, Vec4};
use gltf::{
    animation::{util::ReadOutputs, Interpolation},
    mesh::Mode,
};
use kiln_transform::Transform;
use thiserror::Error;

use crate::{
    ChannelKind, Deformer, Keyframes, MaterialProperty, MemoryMesh, MemoryScene, PropertyValue,
    SceneSource, SkinCluster, SourceMaterial, SourceMesh, SourceNode, VertexChannel,
};

/// Limb size given to joint nodes, glTF does not author one.
pub const DEFAULT_LIMB_SIZE: f32 = 100.0;

#[derive(Debug, Error)]
pub enum GltfLoadError {
    #[error("Failed to read glTF document: {0}")]
    Gltf(#[from] gltf::Error),
    #[error("Primitive {primitive} of mesh '{mesh}' has no positions")]
    MissingPositions { mesh: String, primitive: usize },
}

pub fn load<P: AsRef<Path>>(path: P) -> Result<MemoryScene, GltfLoadError> {
    kiln_profiling::profile_function!();

    let path = path.as_ref();
    let gltf::Gltf { document, blob } = gltf::Gltf::open(path)?;
    let buffers = gltf::import_buffers(&document, path.parent(), blob)?;
    build_scene(&document, &buffers)
}

/// Loads a self-contained document, buffers must be embedded or stored in the binary chunk.
pub fn load_slice(data: &[u8]) -> Result<MemoryScene, GltfLoadError> {
    kiln_profiling::profile_function!();

    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(data)?;
    let buffers = gltf::import_buffers(&document, None, blob)?;
    build_scene(&document, &buffers)
}

fn build_scene(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
) -> Result<MemoryScene, GltfLoadError> {
    let mut scene = MemoryScene::new();

    let materials = document
        .materials()
        .map(|material| load_material(&mut scene, &material))
        .collect::<Vec<_>>();

    let nodes = document
        .nodes()
        .map(|node| {
            let (translation, rotation, scale) = node.transform().decomposed();
            let local = Transform::new(
                Vec3::from(translation),
                Quat::from_array(rotation),
                Vec3::from(scale),
            );
            let name = node
                .name()
                .map(str::to_owned)
                .unwrap_or_else(|| format!("node_{}", node.index()));
            scene.add_node(&name, None, &local)
        })
        .collect::<Vec<_>>();

    for node in document.nodes() {
        for child in node.children() {
            scene.add_child(nodes[node.index()], nodes[child.index()]);
        }
    }

    let root = scene.root_node();
    if let Some(gltf_scene) = document
        .default_scene()
        .or_else(|| document.scenes().next())
    {
        for node in gltf_scene.nodes() {
            scene.add_child(root, nodes[node.index()]);
        }
    }

    let mut joints = BTreeSet::new();
    for skin in document.skins() {
        joints.extend(skin.joints().map(|joint| joint.index()));
    }
    for joint in joints {
        scene.attach_skeleton(nodes[joint], DEFAULT_LIMB_SIZE);
    }

    let mut mesh_skins = HashMap::new();
    for node in document.nodes() {
        if let (Some(mesh), Some(skin)) = (node.mesh(), node.skin()) {
            mesh_skins.entry(mesh.index()).or_insert(skin);
        }
    }

    let mut meshes: Vec<Vec<(SourceMesh, Option<SourceMaterial>)>> = Vec::new();
    for mesh in document.meshes() {
        let mut primitives = Vec::new();
        for primitive in mesh.primitives() {
            let memory_mesh = load_primitive(
                &mesh,
                &primitive,
                buffers,
                mesh_skins.get(&mesh.index()),
                &nodes,
            )?;
            let material = primitive.material().index().map(|index| materials[index]);
            primitives.push((scene.add_mesh(memory_mesh), material));
        }
        meshes.push(primitives);
    }

    for node in document.nodes() {
        if let Some(mesh) = node.mesh() {
            for (source_mesh, material) in &meshes[mesh.index()] {
                scene.attach_mesh(nodes[node.index()], *source_mesh, *material);
            }
        }
    }

    for animation in document.animations() {
        load_animation(&mut scene, &animation, buffers, &nodes);
    }

    Ok(scene)
}

fn load_material(scene: &mut MemoryScene, material: &gltf::Material) -> SourceMaterial {
    let name = material
        .name()
        .map(str::to_owned)
        .unwrap_or_else(|| format!("material_{}", material.index().unwrap_or_default()));
    let source = scene.add_material(&name);
    let pbr = material.pbr_metallic_roughness();

    // Metallic-roughness materials map onto the Stingray PBS property layout.
    scene.set_material_property(source, "Maya", MaterialProperty::value(PropertyValue::Compound));
    scene.set_material_property(
        source,
        "Maya|base_color",
        MaterialProperty::value(PropertyValue::Vector(
            Vec4::from(pbr.base_color_factor()).truncate(),
        )),
    );
    scene.set_material_property(
        source,
        "Maya|metallic",
        MaterialProperty::value(PropertyValue::Scalar(pbr.metallic_factor())),
    );
    scene.set_material_property(
        source,
        "Maya|roughness",
        MaterialProperty::value(PropertyValue::Scalar(pbr.roughness_factor())),
    );

    let textures = [
        (
            "Maya|TEX_color_map",
            pbr.base_color_texture().map(|info| info.texture()),
        ),
        (
            "Maya|TEX_normal_map",
            material.normal_texture().map(|normal| normal.texture()),
        ),
        (
            "Maya|TEX_metallic_map",
            pbr.metallic_roughness_texture().map(|info| info.texture()),
        ),
        (
            "Maya|TEX_roughness_map",
            pbr.metallic_roughness_texture().map(|info| info.texture()),
        ),
    ];
    for (path, texture) in textures {
        let Some(texture) = texture else {
            continue;
        };

        match texture.source().source() {
            gltf::image::Source::Uri { uri, .. } if !uri.starts_with("data:") => {
                scene.set_material_property(source, path, MaterialProperty::texture(uri));
            }
            _ => log::warn!(
                "Texture {} of material '{}' is embedded and has no file name, skipping it.",
                texture.index(),
                name
            ),
        }
    }

    source
}

fn load_primitive(
    mesh: &gltf::Mesh,
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
    skin: Option<&gltf::Skin>,
    nodes: &[SourceNode],
) -> Result<MemoryMesh, GltfLoadError> {
    kiln_profiling::profile_function!();

    let mesh_name = mesh
        .name()
        .map(str::to_owned)
        .unwrap_or_else(|| format!("mesh_{}", mesh.index()));
    let name = if mesh.primitives().len() > 1 {
        format!("{}_{}", mesh_name, primitive.index())
    } else {
        mesh_name.clone()
    };

    let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

    let positions = reader
        .read_positions()
        .ok_or(GltfLoadError::MissingPositions {
            mesh: mesh_name,
            primitive: primitive.index(),
        })?
        .map(Vec3::from)
        .collect::<Vec<_>>();

    let indices = reader
        .read_indices()
        .map(|indices| indices.into_u32().collect::<Vec<_>>())
        .unwrap_or_else(|| (0..positions.len() as u32).collect());

    let polygons = polygons_from_mode(primitive.mode(), &indices);
    let mut memory_mesh = MemoryMesh::new(&name, positions, polygons).with_group(mesh.index());

    if let Some(colors) = reader.read_colors(0) {
        let colors = colors.into_rgba_f32().map(Vec4::from).collect();
        memory_mesh =
            memory_mesh.with_channel(ChannelKind::Color, VertexChannel::by_control_point(colors));
    }
    if let Some(normals) = reader.read_normals() {
        let normals = normals.map(|normal| Vec3::from(normal).extend(0.0)).collect();
        memory_mesh =
            memory_mesh.with_channel(ChannelKind::Normal, VertexChannel::by_control_point(normals));
    }
    if let Some(tangents) = reader.read_tangents() {
        let tangents = tangents.map(Vec4::from).collect();
        memory_mesh = memory_mesh
            .with_channel(ChannelKind::Tangent, VertexChannel::by_control_point(tangents));
    }
    if let Some(tex_coords) = reader.read_tex_coords(0) {
        // Stored bottom-up, the importer flips V back.
        let tex_coords = tex_coords
            .into_f32()
            .map(|[u, v]| Vec4::new(u, 1.0 - v, 0.0, 0.0))
            .collect();
        memory_mesh =
            memory_mesh.with_channel(ChannelKind::Uv, VertexChannel::by_control_point(tex_coords));
    }

    if let (Some(skin), Some(joints), Some(weights)) =
        (skin, reader.read_joints(0), reader.read_weights(0))
    {
        let inverse_bind_matrices = skin
            .reader(|buffer| Some(&buffers[buffer.index()]))
            .read_inverse_bind_matrices()
            .map(|matrices| {
                matrices
                    .map(|matrix| Mat4::from_cols_array_2d(&matrix))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let mut clusters = skin
            .joints()
            .enumerate()
            .map(|(joint_idx, joint)| SkinCluster {
                link: Some(nodes[joint.index()]),
                transform: Mat4::IDENTITY,
                transform_link: inverse_bind_matrices
                    .get(joint_idx)
                    .map(Mat4::inverse)
                    .unwrap_or(Mat4::IDENTITY),
                control_points: Vec::new(),
                weights: Vec::new(),
            })
            .collect::<Vec<_>>();

        for (vertex, (joints, weights)) in joints.into_u16().zip(weights.into_f32()).enumerate() {
            for (joint, weight) in joints.into_iter().zip(weights) {
                if weight <= 0.0 {
                    continue;
                }
                if let Some(cluster) = clusters.get_mut(joint as usize) {
                    cluster.control_points.push(vertex as u32);
                    cluster.weights.push(weight);
                }
            }
        }

        memory_mesh = memory_mesh.with_deformer(Deformer::Skin(clusters));
    }

    Ok(memory_mesh)
}

/// Expands strips and fans into triangles. Points and lines stay as polygons of one or two corners.
fn polygons_from_mode(mode: Mode, indices: &[u32]) -> Vec<Vec<u32>> {
    match mode {
        Mode::Triangles => indices.chunks_exact(3).map(<[u32]>::to_vec).collect(),
        Mode::TriangleStrip => (2..indices.len())
            .map(|i| {
                if i % 2 == 0 {
                    vec![indices[i - 2], indices[i - 1], indices[i]]
                } else {
                    vec![indices[i - 1], indices[i - 2], indices[i]]
                }
            })
            .collect(),
        Mode::TriangleFan => (2..indices.len())
            .map(|i| vec![indices[0], indices[i - 1], indices[i]])
            .collect(),
        Mode::Points => indices.iter().map(|index| vec![*index]).collect(),
        Mode::Lines => indices.chunks_exact(2).map(<[u32]>::to_vec).collect(),
        Mode::LineStrip | Mode::LineLoop => indices.windows(2).map(<[u32]>::to_vec).collect(),
    }
}

enum SampledChannel {
    Translation(Keyframes<Vec3>),
    Rotation(Keyframes<Quat>),
    Scaling(Keyframes<Vec3>),
}

fn load_animation(
    scene: &mut MemoryScene,
    animation: &gltf::Animation,
    buffers: &[gltf::buffer::Data],
    nodes: &[SourceNode],
) {
    kiln_profiling::profile_function!();

    let name = animation
        .name()
        .map(str::to_owned)
        .unwrap_or_else(|| format!("animation_{}", animation.index()));

    let mut channels = Vec::new();
    for channel in animation.channels() {
        let reader = channel.reader(|buffer| Some(&buffers[buffer.index()]));
        let (Some(inputs), Some(outputs)) = (reader.read_inputs(), reader.read_outputs()) else {
            continue;
        };

        let times = inputs.collect::<Vec<_>>();
        // Cubic spline samplers store (in-tangent, value, out-tangent) triples.
        let cubic = matches!(
            channel.sampler().interpolation(),
            Interpolation::CubicSpline
        );
        let node = nodes[channel.target().node().index()];

        let sampled = match outputs {
            ReadOutputs::Translations(values) => SampledChannel::Translation(Keyframes::new(
                times,
                spline_values(values.map(Vec3::from).collect(), cubic),
            )),
            ReadOutputs::Rotations(values) => SampledChannel::Rotation(Keyframes::new(
                times,
                spline_values(values.into_f32().map(Quat::from_array).collect(), cubic),
            )),
            ReadOutputs::Scales(values) => SampledChannel::Scaling(Keyframes::new(
                times,
                spline_values(values.map(Vec3::from).collect(), cubic),
            )),
            ReadOutputs::MorphTargetWeights(_) => {
                log::debug!("Skipping morph target weights in animation '{}'.", name);
                continue;
            }
        };
        channels.push((node, sampled));
    }

    let times = channels.iter().flat_map(|(_, sampled)| match sampled {
        SampledChannel::Translation(keys) | SampledChannel::Scaling(keys) => keys.times.iter(),
        SampledChannel::Rotation(keys) => keys.times.iter(),
    });
    let (start, stop) = times.fold(None, |range: Option<(f32, f32)>, time| match range {
        Some((start, stop)) => Some((start.min(*time), stop.max(*time))),
        None => Some((*time, *time)),
    })
    .unwrap_or((0.0, 0.0));

    let layer = scene.add_animation_stack(&name, start, stop);
    for (node, sampled) in channels {
        match sampled {
            SampledChannel::Translation(keys) => scene.set_translation_keys(node, layer, keys),
            SampledChannel::Rotation(keys) => scene.set_rotation_keys(node, layer, keys),
            SampledChannel::Scaling(keys) => scene.set_scaling_keys(node, layer, keys),
        }
    }
}

fn spline_values<T: Copy>(values: Vec<T>, cubic: bool) -> Vec<T> {
    if cubic {
        values.chunks_exact(3).map(|triple| triple[1]).collect()
    } else {
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AnimationSample, NodeAttribute, TransformChannel};

    // One triangle on node "tri" animated by "slide" from t=0.5 to t=1.5.
    const TRIANGLE_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "name": "tri", "mesh": 0 }, { "name": "stray" }],
        "materials": [{
            "name": "painted",
            "pbrMetallicRoughness": {
                "baseColorFactor": [0.5, 0.25, 1.0, 1.0],
                "baseColorTexture": { "index": 0 },
                "metallicFactor": 0.0
            }
        }],
        "textures": [{ "source": 0 }],
        "images": [{ "uri": "textures/paint.png" }],
        "meshes": [{
            "name": "triangle",
            "primitives": [{ "attributes": { "POSITION": 0 }, "material": 0 }]
        }],
        "animations": [{
            "name": "slide",
            "channels": [{ "sampler": 0, "target": { "node": 0, "path": "translation" } }],
            "samplers": [{ "input": 1, "output": 2 }]
        }],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
              "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
            { "bufferView": 1, "componentType": 5126, "count": 2, "type": "SCALAR",
              "min": [0.5], "max": [1.5] },
            { "bufferView": 2, "componentType": 5126, "count": 2, "type": "VEC3" }
        ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 8 },
            { "buffer": 0, "byteOffset": 44, "byteLength": 24 }
        ],
        "buffers": [{
            "byteLength": 68,
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAAAAPwAAwD8AAAAAAAAAAAAAAAAAAABAAAAAAAAAAAA="
        }]
    }"#;

    #[test]
    fn loads_triangle_scene() {
        let scene = load_slice(TRIANGLE_GLTF.as_bytes()).unwrap();

        assert_eq!(scene.mesh_count(), 1);
        let mesh = SourceMesh(0);
        assert_eq!(scene.mesh_name(mesh), "triangle");
        assert_eq!(scene.polygon_count(mesh), 1);
        assert_eq!(scene.polygon_size(mesh, 0), 3);
        assert_eq!(scene.control_points(mesh)[1], Vec3::X);

        let root_children = scene.node_children(scene.root_node());
        assert_eq!(root_children.len(), 1);
        let tri = root_children[0];
        assert_eq!(scene.node_name(tri), "tri");
        assert_eq!(scene.node_attributes(tri), &[NodeAttribute::Mesh(mesh)]);
        assert_eq!(scene.node_material(tri, 0), Some(SourceMaterial(0)));

        // "stray" is not part of the default scene.
        assert_eq!(scene.node_count(), 3);
    }

    #[test]
    fn maps_pbr_material_properties() {
        let scene = load_slice(TRIANGLE_GLTF.as_bytes()).unwrap();
        let material = SourceMaterial(0);

        assert_eq!(scene.material_name(material), "painted");
        assert!(scene.material_property(material, "Maya").is_some());
        assert_eq!(
            scene
                .material_property(material, "Maya|TEX_color_map")
                .and_then(|property| property.texture.as_deref()),
            Some("textures/paint.png")
        );
        assert_eq!(
            scene
                .material_property(material, "Maya|metallic")
                .map(|property| &property.value),
            Some(&PropertyValue::Scalar(0.0))
        );
    }

    #[test]
    fn loads_animation_range_and_keys() {
        let scene = load_slice(TRIANGLE_GLTF.as_bytes()).unwrap();
        let stack = &scene.animation_stacks()[0];

        assert_eq!(stack.name, "slide");
        assert_eq!(stack.start, 0.5);
        assert_eq!(stack.stop, 1.5);

        let tri = scene.node_children(scene.root_node())[0];
        assert_eq!(
            scene.curve_key_times(tri, stack.layers[0], TransformChannel::Translation),
            Some(vec![0.5, 1.5])
        );
        let sample = AnimationSample {
            stack: 0,
            time: 1.0,
        };
        let local = scene.evaluate_local_transform(tri, Some(sample));
        assert!(local.translation.abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn strips_and_fans_become_triangles() {
        let strip = polygons_from_mode(Mode::TriangleStrip, &[0, 1, 2, 3]);
        assert_eq!(strip, vec![vec![0, 1, 2], vec![2, 1, 3]]);

        let fan = polygons_from_mode(Mode::TriangleFan, &[0, 1, 2, 3]);
        assert_eq!(fan, vec![vec![0, 1, 2], vec![0, 2, 3]]);

        let lines = polygons_from_mode(Mode::Lines, &[0, 1, 2, 3]);
        assert!(lines.iter().all(|polygon| polygon.len() == 2));
    }
}
