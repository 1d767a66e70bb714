use std::path::{Path, PathBuf};

use anyhow::Context;
use kiln_importer::{import_scene, ImportOutput, ImportSettings};
use kiln_scene::{SceneSource, SourceNode};

/// `input` with its extension replaced by `mdl`.
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("mdl")
}

/// Converts `scene` and writes the packed model to `output`.
///
/// Nothing is written when the conversion fails.
pub fn convert_scene<S: SceneSource + ?Sized>(
    scene: &S,
    root_override: Option<SourceNode>,
    settings: &ImportSettings,
    output: &Path,
) -> anyhow::Result<ImportOutput> {
    kiln_profiling::profile_function!();

    let converted = import_scene(scene, root_override, settings)
        .with_context(|| format!("Failed to convert {}", output.display()))?;
    kiln_packing::write_model_to_file(&converted.model, output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    Ok(converted)
}

/// Loads a glTF document and converts it.
pub fn convert_gltf(
    input: &Path,
    output: &Path,
    settings: &ImportSettings,
) -> anyhow::Result<ImportOutput> {
    let scene = kiln_scene::gltf_loader::load(input)
        .with_context(|| format!("Failed to load {}", input.display()))?;

    log::info!("Converting {} to {}", input.display(), output.display());
    convert_scene(&scene, None, settings, output)
}
