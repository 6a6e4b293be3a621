pub mod api;
pub mod auth;
pub mod engagement;
pub mod moderation;
pub mod pages;
pub mod posts;
pub mod report;
pub mod uploads;
