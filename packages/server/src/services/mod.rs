pub mod account;
pub mod content;
pub mod feed;
pub mod moderation;
