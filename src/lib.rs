pub mod config;
pub mod error;
pub mod filter;
pub mod s3;
pub mod server;
pub mod types;

pub use config::{Credentials, ServerConfig};
pub use error::{FilterError, FilterResult};
pub use filter::{HttpImageFilter, ImageFilter, TempImage};
pub use s3::{ImageStore, S3Client};
pub use server::{create_router, AppState};
pub use types::*;
