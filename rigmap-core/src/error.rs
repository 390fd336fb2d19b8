use thiserror::Error;

use crate::naming::HumanSlot;

/// Why no armature root could be derived under a search boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectError {
    #[error("no avatar found under '{root}'")]
    NoAvatar { root: String },
    #[error("no humanoid avatar found under '{root}'")]
    NoHumanoid { root: String },
    #[error("humanoid avatar on '{avatar}' has no resolvable broad bones")]
    NoResolvableBones { avatar: String },
    #[error("humanoid bones of '{avatar}' are not under '{boundary}'")]
    OutsideBoundary { avatar: String, boundary: String },
}

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("component on '{node}' references unknown path '{path}'")]
    UnknownPath { node: String, path: String },
    #[error("avatar on '{node}' maps {slot} to unknown path '{path}'")]
    UnknownBone { node: String, slot: HumanSlot, path: String },
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("no armature root for destination '{destination}': {source}")]
    NoArmature {
        destination: String,
        #[source]
        source: DetectError,
    },
}
