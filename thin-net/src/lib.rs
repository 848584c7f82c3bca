// thin-net/src/lib.rs
pub mod http;
pub mod repository;
pub mod validation;

pub use repository::MavenRepository;
pub use validation::{validate_repository_url, verify_checksum};
