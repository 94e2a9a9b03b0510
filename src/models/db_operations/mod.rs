pub mod comments_db_operations;
pub mod media_db_operations;
pub mod posts_db_operations;
pub mod publish_db_operations;
pub mod tags_db_operations;
pub mod users_db_operations;

#[cfg(test)]
pub(crate) mod test_support;
