// database/builds.rs - Build projects owned by a user

pub mod model;
pub mod query;
