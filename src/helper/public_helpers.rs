use serde_json::Value;

use crate::cache::{self, CacheKey, CacheResource};
use crate::error::AppResult;
use crate::models::db_operations::posts_db_operations::{self, PostFilter};
use crate::models::{Pagination, PostStatus, PostSummary};
use crate::{AppState, DbPool};

fn normalized(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Published posts, newest first, optionally narrowed to a tag slug or a
/// title search. Listings without a title search come from the query
/// cache when possible; free-text searches always hit the database.
pub fn fetch_published_posts(
    pool: &DbPool,
    state: &AppState,
    tag: Option<&str>,
    title_query: Option<&str>,
    pagination: Pagination,
) -> AppResult<Value> {
    let (limit, offset) = pagination.limit_offset();
    let filter = PostFilter {
        status: Some(PostStatus::Published),
        tag_slug: normalized(tag).map(|t| t.to_lowercase()),
        title_query: normalized(title_query),
        ..PostFilter::default()
    };

    if filter.title_query.is_some() {
        let conn = pool.get()?;
        let posts = posts_db_operations::read_post_summaries(&conn, &filter, limit, offset)?;
        return Ok(serde_json::to_value(posts)?);
    }

    let key = CacheKey::new(
        CacheResource::Posts,
        &[
            ("limit", Some(limit.to_string())),
            ("offset", Some(offset.to_string())),
            ("tag", filter.tag_slug.clone()),
        ],
    );
    let generation = cache::generation(state, CacheResource::Posts);
    if let Some(hit) = cache::cached(state, &key) {
        return Ok(hit);
    }

    let conn = pool.get()?;
    let posts = serde_json::to_value(posts_db_operations::read_post_summaries(&conn, &filter, limit, offset)?)?;
    cache::store(state, key, posts.clone(), generation);
    Ok(posts)
}

/// Admin listing over any status; bypasses the cache.
pub fn fetch_posts_with_status(
    pool: &DbPool,
    status: Option<PostStatus>,
    tag: Option<&str>,
    title_query: Option<&str>,
    pagination: Pagination,
) -> AppResult<Vec<PostSummary>> {
    let (limit, offset) = pagination.limit_offset();
    let filter = PostFilter {
        status,
        author_id: None,
        tag_slug: normalized(tag).map(|t| t.to_lowercase()),
        title_query: normalized(title_query),
    };
    let conn = pool.get()?;
    Ok(posts_db_operations::read_post_summaries(&conn, &filter, limit, offset)?)
}
