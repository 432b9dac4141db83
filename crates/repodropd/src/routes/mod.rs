pub mod auth;
pub mod pages;
pub mod search;
pub mod upload;
