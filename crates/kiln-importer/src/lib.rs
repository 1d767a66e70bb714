//! Converts an authored scene into a [`Model`].
//!
//! A conversion runs in fixed stages: materials, meshes (with their skins), the node tree, bone
//! resolution, animations and finally collision shapes. Later stages look up what earlier ones
//! produced through the [`ImportContext`], which is dropped once the conversion is done.

use glam::Vec3;
use kiln_model::{Model, Parameter, ParameterValue, TRANSLATION};
use kiln_scene::{SceneSource, SourceNode};
use kiln_transform::Transform;

mod animation;
mod bones;
mod collision;
mod context;
mod error;
mod material;
mod mesh;
mod nodes;
mod relocation;
mod settings;
mod skeleton;

pub use animation::extract_animations;
pub use bones::resolve_bones;
pub use collision::{
    build_collision, capsule_extents, weld_positions, CollisionBuckets, CollisionInstance,
    CollisionKind,
};
pub use context::{BoneKey, ImportContext};
pub use error::{CollisionDefect, ImportError};
pub use material::convert_materials;
pub use mesh::{convert_mesh, convert_meshes, read_channel, weld_vertices, WeldedVertices};
pub use nodes::build_node_hierarchy;
pub use relocation::{canonicalize_lexically, RelocationPolicy};
pub use settings::{ImportSettings, MeshPacking};
pub use skeleton::bind_skin;

/// A converted model plus every texture path its materials reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOutput {
    pub model: Model,
    pub referenced_textures: Vec<String>,
}

/// Converts `scene` into a new model.
///
/// With `root_override` only the subtree below that node is converted. Its translation is dropped and
/// collision shapes are moved so they stay where they were relative to the override node.
pub fn import_scene<S: SceneSource + ?Sized>(
    scene: &S,
    root_override: Option<SourceNode>,
    settings: &ImportSettings,
) -> Result<ImportOutput, ImportError> {
    let _frame = kiln_profiling::FrameGuard::new();
    kiln_profiling::profile_function!();

    let mut model = Model::new();
    let mut context = ImportContext::new(settings);

    convert_materials(scene, &mut model, &mut context);
    convert_meshes(scene, &mut model, &mut context)?;
    build_node_hierarchy(scene, root_override, &mut model, &mut context)?;
    resolve_bones(&mut model, &context)?;

    if settings.export_animations {
        extract_animations(scene, &mut model, &context)?;
    }

    if let Some(root_override) = root_override {
        if let Some(root) = model.root_node {
            model.nodes[root]
                .params
                .insert(TRANSLATION, Parameter::new(ParameterValue::Float3(Vec3::ZERO)));
        }

        let global = scene.evaluate_global_transform(root_override, None);
        context.collision_correction = Transform::from_translation(global.translation).inverse();
    }

    build_collision(scene, &mut model, &context);

    log::info!(
        "Converted {} nodes, {} meshes, {} materials and {} animations",
        model.nodes.len(),
        model.meshes.len(),
        model.materials.len(),
        model.animations.len()
    );

    Ok(ImportOutput {
        model,
        referenced_textures: context.referenced_textures,
    })
}
