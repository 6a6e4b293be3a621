pub mod filename;
pub mod hashtag;
pub mod notice;
pub mod session;
