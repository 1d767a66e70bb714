use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use kiln::kiln_importer::{ImportSettings, MeshPacking};
use kiln::kiln_model::Model;
use kiln::kiln_scene::{gltf_loader, SceneSource};
use kiln::Kiln;
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a single glTF scene into a model file
    Convert {
        /// Scene to convert, .gltf or .glb
        input: PathBuf,

        /// Output model, defaults to the input with the mdl extension
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip animation curves
        #[arg(long, default_value_t = false)]
        no_animations: bool,

        /// How meshes share vertex and index buffers
        #[arg(long, value_enum, default_value_t = Packing::None)]
        packing: Packing,

        /// Export every child of the scene root as its own model
        #[arg(long, default_value_t = false)]
        split_root_children: bool,
    },
    /// Convert every asset listed in a content description
    Content {
        /// Content description json
        #[arg(short, long)]
        content: PathBuf,

        /// Directory relative asset inputs are resolved against
        #[arg(short, long)]
        input: PathBuf,

        /// Directory converted assets are written to
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Read a model file back and print what it contains
    Inspect { model: PathBuf },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Packing {
    WholeScene,
    PerMesh,
    None,
}

impl From<Packing> for MeshPacking {
    fn from(value: Packing) -> Self {
        match value {
            Packing::WholeScene => MeshPacking::PackWholeScene,
            Packing::PerMesh => MeshPacking::PackPerMesh,
            Packing::None => MeshPacking::NoPacking,
        }
    }
}

#[derive(Deserialize, Debug, Default, PartialEq)]
struct ContentDesc {
    #[serde(default)]
    meshes: Vec<MeshEntry>,
    #[serde(default)]
    files: Vec<FileEntry>,
}

#[derive(Deserialize, Debug, PartialEq)]
struct MeshEntry {
    #[serde(rename = "in")]
    input: String,
    #[serde(rename = "assetName", default)]
    asset_name: Option<String>,
    #[serde(default)]
    noanim: bool,
}

#[derive(Deserialize, Debug, PartialEq)]
struct FileEntry {
    #[serde(rename = "in")]
    input: String,
    #[serde(rename = "assetName", default)]
    asset_name: Option<String>,
}

pub fn internal_main() -> Result<()> {
    let _kiln = Kiln::new("Kiln");

    let args = Args::parse();
    match args.command {
        Command::Convert {
            input,
            output,
            no_animations,
            packing,
            split_root_children,
        } => {
            let output = output.unwrap_or_else(|| kiln::default_output_path(&input));
            let settings = ImportSettings {
                export_animations: !no_animations,
                mesh_packing: packing.into(),
                ..Default::default()
            };

            if split_root_children {
                convert_root_children(&input, &output, &settings)
            } else {
                kiln::convert_gltf(&input, &output, &settings).map(|_| ())
            }
        }
        Command::Content {
            content,
            input,
            output,
        } => convert_content(&content, &input, &output),
        Command::Inspect { model } => inspect(&model),
    }
}

fn convert_root_children(input: &Path, output: &Path, settings: &ImportSettings) -> Result<()> {
    let scene = gltf_loader::load(input)
        .with_context(|| format!("Failed to load {}", input.display()))?;

    for child in scene.node_children(scene.root_node()) {
        let output = child_output_path(output, scene.node_name(*child));
        log::info!("Converting '{}' to {}", scene.node_name(*child), output.display());
        kiln::convert_scene(&scene, Some(*child), settings, &output)?;
    }
    Ok(())
}

/// `level.mdl` becomes `level.<child>.mdl`.
fn child_output_path(output: &Path, child: &str) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.with_file_name(format!("{}.{}.mdl", stem, child))
}

fn convert_content(content: &Path, assets_in: &Path, assets_out: &Path) -> Result<()> {
    log::info!("Content file: {}", content.display());
    log::info!("Assets input directory: {}", assets_in.display());
    log::info!("Assets output directory: {}", assets_out.display());

    let text = fs::read_to_string(content)
        .with_context(|| format!("Unable to open the content description {}", content.display()))?;
    let desc: ContentDesc = serde_json::from_str(&text)
        .with_context(|| format!("Invalid content description {}", content.display()))?;

    for mesh in &desc.meshes {
        let asset_name = mesh
            .asset_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| kiln::default_output_path(Path::new(&mesh.input)));

        let input = assets_in.join(&mesh.input);
        let output = assets_out.join(&asset_name);
        create_parent_dir(&output)?;

        let settings = ImportSettings {
            export_animations: !mesh.noanim,
            file_directory: asset_name
                .parent()
                .map(|dir| dir.to_string_lossy().into_owned())
                .unwrap_or_default(),
            ..Default::default()
        };

        log::info!("Converting mesh '{}'", input.display());
        let converted = kiln::convert_gltf(&input, &output, &settings)?;

        for texture in &converted.referenced_textures {
            let from = sibling(&input, texture);
            let to = sibling(&output, texture);
            log::info!("Copying referenced texture '{}' to '{}'", from.display(), to.display());
            copy_file(&from, &to)?;
        }
    }

    for file in &desc.files {
        let from = assets_in.join(&file.input);
        let to = assets_out.join(file.asset_name.as_deref().unwrap_or(&file.input));
        copy_file(&from, &to)?;
    }

    Ok(())
}

fn sibling(file: &Path, relative: &str) -> PathBuf {
    file.parent()
        .unwrap_or_else(|| Path::new(""))
        .join(relative)
}

fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    create_parent_dir(to)?;
    fs::copy(from, to)
        .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))?;
    Ok(())
}

fn inspect(path: &Path) -> Result<()> {
    let model = kiln::kiln_packing::read_model_from_file(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let collision = &model.collision;
    log::info!(
        "{}: {} nodes, {} meshes in {} mesh data, {} materials, {} animations, {} collision shapes",
        path.display(),
        model.nodes.len(),
        model.meshes.len(),
        model.mesh_data.len(),
        model.materials.len(),
        model.animations.len(),
        collision.len()
    );
    for animation in &model.animations {
        log::info!(
            "Animation '{}' starts at {} and lasts {}",
            animation.name,
            animation.start_time,
            animation.duration
        );
    }

    if let Some(root) = model.root_node {
        log_node(&model, root, 0);
    }
    Ok(())
}

fn log_node(model: &Model, node: usize, depth: usize) {
    let current = &model.nodes[node];
    log::info!(
        "{:indent$}{} ({} meshes)",
        "",
        current.name,
        current.meshes.len(),
        indent = depth * 2
    );
    for child in &current.children {
        log_node(model, *child, depth + 1);
    }
}
