// database/users.rs - User accounts, credentials and their one-time codes

pub mod model;
pub mod query;
