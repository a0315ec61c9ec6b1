pub mod catalog;
pub mod data;
pub mod driver;
pub mod field;
pub mod interaction;
pub mod pass;
pub mod pipeline;
pub mod render;
pub mod settings;
pub mod source;
mod stokes;
pub mod topology;
pub mod vocabulary;

pub use crate::stokes::{Problem, Stokes};
pub use settings::Settings;
