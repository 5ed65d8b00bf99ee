pub mod book;
pub mod member;
pub mod subscription;
pub mod user;
