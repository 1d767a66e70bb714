use glam::Vec3;
use kiln_model::{material, Material, Model, ParameterValue};
use kiln_scene::{PropertyValue, SceneSource, SourceMaterial};

use crate::ImportContext;

/// Compound under which Stingray PBS materials store their attributes.
pub const STINGRAY_COMPOUND: &str = "Maya";
pub const DIFFUSE_PROPERTY: &str = "DiffuseColor";
pub const NORMAL_MAP_PROPERTY: &str = "NormalMap";
pub const BUMP_PROPERTY: &str = "Bump";

/// Converts every source material into a model material with a fresh id.
pub fn convert_materials<S: SceneSource + ?Sized>(
    scene: &S,
    model: &mut Model,
    context: &mut ImportContext,
) {
    kiln_profiling::profile_function!();
    log::info!("Parsing materials...");

    for index in 0..scene.material_count() {
        let source = SourceMaterial(index);
        let name = scene.material_name(source);
        log::debug!("Parsing material '{}'...", name);

        let material = model.add_material(name);
        context.materials.insert(source, material);

        let material = &mut model.materials[material];
        if scene
            .material_property(source, STINGRAY_COMPOUND)
            .is_some()
        {
            convert_stingray(scene, source, material, context);
        } else {
            convert_classic(scene, source, material, context);
        }
    }
}

fn convert_stingray<S: SceneSource + ?Sized>(
    scene: &S,
    source: SourceMaterial,
    material: &mut Material,
    context: &mut ImportContext,
) {
    let property = |name: &str| {
        scene.material_property(source, &format!("{}|{}", STINGRAY_COMPOUND, name))
    };
    let scalar = |name: &str| match property(name).map(|property| &property.value) {
        Some(PropertyValue::Scalar(value)) => *value,
        _ => 0.0,
    };
    let texture = |name: &str| property(name).and_then(|property| property.texture.clone());

    let mut base_color = match property("base_color").map(|property| &property.value) {
        Some(PropertyValue::Vector(color)) => *color,
        _ => Vec3::ZERO,
    };
    let mut metallic = scalar("metallic");
    let mut roughness = scalar("roughness");

    // Textured channels are not multiplied by their numeric value.
    if let Some(file_name) = texture("TEX_color_map") {
        assign_texture(material, context, material::TEX_DIFFUSE, &file_name);
        base_color = Vec3::ONE;
    }
    if let Some(file_name) = texture("TEX_normal_map") {
        assign_texture(material, context, material::TEX_NORMAL, &file_name);
    }
    if let Some(file_name) = texture("TEX_metallic_map") {
        assign_texture(material, context, material::TEX_METALLIC, &file_name);
        metallic = 1.0;
    }
    if let Some(file_name) = texture("TEX_roughness_map") {
        assign_texture(material, context, material::TEX_ROUGHNESS, &file_name);
        roughness = 1.0;
    }

    set_value(
        material,
        material::DIFFUSE_COLOR,
        ParameterValue::Float4(base_color.extend(1.0)),
    );
    set_value(material, material::METALLIC, ParameterValue::Float(metallic));
    set_value(material, material::ROUGHNESS, ParameterValue::Float(roughness));
}

fn convert_classic<S: SceneSource + ?Sized>(
    scene: &S,
    source: SourceMaterial,
    material: &mut Material,
    context: &mut ImportContext,
) {
    let diffuse = scene.material_property(source, DIFFUSE_PROPERTY);
    if let Some(file_name) = diffuse.and_then(|property| property.texture.as_deref()) {
        assign_texture(material, context, material::TEX_DIFFUSE, file_name);
    }

    // Normal maps are often reported as bump maps.
    let normal = scene
        .material_property(source, NORMAL_MAP_PROPERTY)
        .and_then(|property| property.texture.as_deref())
        .or_else(|| {
            scene
                .material_property(source, BUMP_PROPERTY)
                .and_then(|property| property.texture.as_deref())
        });
    if let Some(file_name) = normal {
        assign_texture(material, context, material::TEX_NORMAL, file_name);
    }

    if let Some(PropertyValue::Vector(color)) = diffuse.map(|property| &property.value) {
        set_value(
            material,
            material::DIFFUSE_COLOR,
            ParameterValue::Float4(color.extend(1.0)),
        );
    }
}

fn assign_texture(
    material: &mut Material,
    context: &mut ImportContext,
    parameter: &str,
    file_name: &str,
) {
    let settings = context.settings;
    let path = settings
        .relocation
        .asset_name(&settings.file_directory, file_name);

    material.set_texture(parameter, &path);
    context.referenced_textures.push(path);
}

fn set_value(material: &mut Material, parameter: &str, value: ParameterValue) {
    material
        .params
        .find_or_create(parameter, value.clone())
        .set_static_value(value);
}
