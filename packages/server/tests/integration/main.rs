mod common;

mod moderation;
mod uploads;
