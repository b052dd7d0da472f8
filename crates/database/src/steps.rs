// database/steps.rs - Steps recorded against a build project

pub mod model;
pub mod query;
