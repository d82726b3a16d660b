// Business domains
pub mod moderation;
