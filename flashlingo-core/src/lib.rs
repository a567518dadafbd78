pub mod deck;
pub mod errors;
pub mod filters;
pub mod models;
pub mod quiz;
pub mod repo;
pub mod stats;
pub mod topics;

pub use deck::*;
pub use errors::*;
pub use filters::*;
pub use models::*;
pub use quiz::*;
pub use repo::*;
pub use stats::*;
pub use topics::*;
