pub mod error;
pub mod post;
pub mod repos;
pub mod rewrite;
