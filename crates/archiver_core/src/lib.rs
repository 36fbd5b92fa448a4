//! Archiver core: lesson catalog model, output layout, removal policy and the
//! pure run-progress state machine.
mod layout;
mod lesson;
mod msg;
mod policy;
mod slug;
mod state;
mod update;
mod view_model;

pub use layout::{OutputArtifact, OutputFormat, OutputLayout, RunMode};
pub use lesson::{Catalog, LessonRef, OrdinalStyle};
pub use msg::{ConversionResultKind, ProgressMsg};
pub use policy::{RemovalPolicy, RemovalRule};
pub use slug::{original_slug, sanitize_component};
pub use state::{RunState, Stage};
pub use update::update;
pub use view_model::RunView;

pub use url::Url;
