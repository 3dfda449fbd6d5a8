pub mod application;
pub mod lifecycle;
pub mod marketplace;
pub mod validation;

pub use application::ApplicationStatus;
pub use lifecycle::{LifecycleAction, ProjectStatus, ViewerRole};
pub use marketplace::{ItemCondition, ItemStatus};
