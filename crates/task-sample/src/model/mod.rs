//! Resource types of the task tracker.

pub mod person;
pub mod project;
pub mod task;

pub use person::Person;
pub use project::{Project, ProjectId};
pub use task::Task;
