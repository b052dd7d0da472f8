// database/auth.rs - Used refresh tokens, kept until they would have expired anyway

pub mod model;
pub mod query;
