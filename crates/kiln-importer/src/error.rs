use kiln_transform::RotationOrder;
use thiserror::Error;

/// Reasons a conversion fails. Every variant aborts the conversion and no model is produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImportError {
    #[error("Mesh '{mesh}' is not supported: {reason}")]
    UnsupportedTopology { mesh: String, reason: String },

    #[error("Channel {channel} of mesh '{mesh}' uses an unsupported addressing mode ({mode})")]
    UnknownAddressingMode {
        mesh: String,
        channel: &'static str,
        mode: String,
    },

    #[error("Node '{node}' uses unsupported rotation order {order:?}")]
    UnsupportedRotationOrder { node: String, order: RotationOrder },

    #[error("Bone {bone} of mesh '{mesh}' is not linked to any converted node")]
    MissingBoneNodeLink { mesh: String, bone: usize },

    #[error("Skin of mesh '{mesh}' references control point {control_point} which does not exist")]
    InvalidSkinBinding { mesh: String, control_point: u32 },

    #[error("Skin of mesh '{mesh}' weights control point {control_point} which produced no vertex")]
    UnboundSkinInfluence { mesh: String, control_point: u32 },

    #[error("Channel {channel} of mesh '{mesh}' has no element at {index}")]
    MalformedChannel {
        mesh: String,
        channel: &'static str,
        index: usize,
    },
}

/// Per-shape collision defects. These are logged and the shape is skipped, never returned from a conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CollisionDefect {
    #[error("Invalid collision geometry '{mesh}': {index_count} indices is not a triangle list")]
    InvalidCollisionGeometry { mesh: String, index_count: usize },

    #[error("Collision mesh '{mesh}' has no control point {control_point}")]
    MissingControlPoint { mesh: String, control_point: usize },
}
