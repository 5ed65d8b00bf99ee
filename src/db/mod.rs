pub mod book_repository;
pub mod member_repository;
pub mod plan_repository;
pub mod postgres_book_repository;
pub mod postgres_member_repository;
pub mod postgres_plan_repository;
pub mod postgres_subscription_repository;
pub mod postgres_user_repository;
pub mod subscription_repository;
pub mod user_repository;

#[cfg(test)]
pub mod mock_db;
