pub mod corpus;
pub mod error;
pub mod types;
pub mod utils;
