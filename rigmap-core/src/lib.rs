pub mod naming;
pub mod rig;
pub mod index;
pub mod armature;
pub mod resolve;
pub mod remap;
pub mod record;
pub mod capture;
pub mod build;
pub mod diagnostics;
pub mod scene;
pub mod config;
pub mod error;

pub use build::{Builder, ComponentActivator, Destination, MarkActive};
pub use config::RetargetConfig;
pub use error::{BuildError, DetectError, SceneError};
pub use record::ConstraintRecord;
pub use rig::{NodeId, RigTree};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
