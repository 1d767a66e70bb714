use std::path::{Component, Path, PathBuf};

/// Decides under which name a texture referenced by the scene ends up in the converted model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RelocationPolicy {
    /// Keep the path exactly as authored.
    #[default]
    Keep,
    /// Join the path to the scene directory and fold `.` and `..` away.
    RelativeToDirectory,
}

impl RelocationPolicy {
    pub fn asset_name(&self, directory: &str, path: &str) -> String {
        match self {
            RelocationPolicy::Keep => path.to_owned(),
            RelocationPolicy::RelativeToDirectory => {
                let joined = Path::new(directory).join(path.replace('\\', "/"));
                to_forward_slashes(&canonicalize_lexically(&joined))
            }
        }
    }
}

/// Resolves `.` and `..` without touching the file system. Leading `..` that cannot be folded are kept.
pub fn canonicalize_lexically(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    result.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    result.pop();
                } else if !result.has_root() {
                    result.push("..");
                }
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

fn to_forward_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
