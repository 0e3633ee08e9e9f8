pub mod entities;
pub mod types;
