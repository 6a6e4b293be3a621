pub mod comment;
pub mod comment_like;
pub mod post;
pub mod post_attachment;
pub mod post_image;
pub mod post_like;
pub mod user;
