pub mod client;
pub mod error;
pub mod models;
pub mod token;

pub use client::{ApiClient, AssetUpload};
pub use error::ApiError;
pub use token::{StaticToken, TokenFile, TokenProvider};
