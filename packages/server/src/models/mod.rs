pub mod post;
pub mod shared;
