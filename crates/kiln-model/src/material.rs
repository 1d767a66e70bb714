use crate::{ParameterBlock, ParameterValue};

pub const DIFFUSE_COLOR: &str = "diffuseColor";
pub const METALLIC: &str = "metallic";
pub const ROUGHNESS: &str = "roughness";
pub const TEX_DIFFUSE: &str = "texDiffuse";
pub const TEX_NORMAL: &str = "texNormal";
pub const TEX_METALLIC: &str = "texMetallic";
pub const TEX_ROUGHNESS: &str = "texRoughness";

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub id: u32,
    pub name: String,
    pub params: ParameterBlock,
}

impl Material {
    /// Path stored in a texture parameter such as [`TEX_DIFFUSE`].
    pub fn texture(&self, parameter: &str) -> Option<&str> {
        self.params
            .get(parameter)
            .and_then(|parameter| parameter.static_value().as_str())
    }

    pub fn set_texture(&mut self, parameter: &str, path: &str) {
        self.params
            .find_or_create(parameter, ParameterValue::String(String::new()))
            .set_static_value(ParameterValue::String(path.to_owned()));
    }
}
