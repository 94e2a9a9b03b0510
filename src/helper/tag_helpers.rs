use serde::Deserialize;
use serde_json::Value;

use crate::cache::{self, CacheKey, CacheResource};
use crate::error::{conflict_on_unique, AppError, AppResult};
use crate::helper::sanitization_helpers::clean_plain_text;
use crate::models::db_operations::tags_db_operations;
use crate::models::slug::slugify;
use crate::models::Tag;
use crate::{AppState, DbPool};

pub const MAX_TAG_NAME_LEN: usize = 50;
pub const MAX_TAG_DESCRIPTION_LEN: usize = 300;

const DUPLICATE_TAG: &str = "A tag with this name already exists.";

#[derive(Debug, Deserialize)]
pub struct TagForm {
    pub name: String,
    pub description: Option<String>,
}

struct CleanTag {
    name: String,
    slug: String,
    description: Option<String>,
}

fn validate_tag_form(form: &TagForm) -> AppResult<CleanTag> {
    let name = clean_plain_text(&form.name);
    if name.is_empty() {
        return Err(AppError::validation("Tag name is required."));
    }
    if name.chars().count() > MAX_TAG_NAME_LEN {
        return Err(AppError::Validation(format!(
            "Tag name cannot exceed {} characters.",
            MAX_TAG_NAME_LEN
        )));
    }
    let description = form
        .description
        .as_deref()
        .map(clean_plain_text)
        .filter(|d| !d.is_empty());
    if description.as_ref().map_or(false, |d| d.chars().count() > MAX_TAG_DESCRIPTION_LEN) {
        return Err(AppError::Validation(format!(
            "Tag description cannot exceed {} characters.",
            MAX_TAG_DESCRIPTION_LEN
        )));
    }
    Ok(CleanTag {
        slug: slugify(&name),
        name,
        description,
    })
}

/// All tags with published post counts, served from the query cache.
pub fn list_tags(pool: &DbPool, state: &AppState) -> AppResult<Value> {
    let key = CacheKey::new(CacheResource::Tags, &[]);
    let generation = cache::generation(state, CacheResource::Tags);
    if let Some(hit) = cache::cached(state, &key) {
        return Ok(hit);
    }
    let conn = pool.get()?;
    let tags = serde_json::to_value(tags_db_operations::read_all_tags(&conn)?)?;
    cache::store(state, key, tags.clone(), generation);
    Ok(tags)
}

pub fn get_tag(pool: &DbPool, tag_id: i64) -> AppResult<Tag> {
    let conn = pool.get()?;
    tags_db_operations::read_tag(&conn, tag_id)?.ok_or(AppError::NotFound("Tag"))
}

pub fn create_tag(pool: &DbPool, state: &AppState, form: &TagForm) -> AppResult<Tag> {
    let tag = validate_tag_form(form)?;
    let conn = pool.get()?;
    let tag_id = tags_db_operations::create_tag(&conn, &tag.name, &tag.slug, tag.description.as_deref())
        .map_err(|e| conflict_on_unique(e, DUPLICATE_TAG))?;

    log::info!("Created tag {} ({})", tag_id, tag.slug);
    cache::invalidate(state, &[CacheResource::Tags]);
    tags_db_operations::read_tag(&conn, tag_id)?.ok_or(AppError::NotFound("Tag"))
}

pub fn update_tag(pool: &DbPool, state: &AppState, tag_id: i64, form: &TagForm) -> AppResult<Tag> {
    let tag = validate_tag_form(form)?;
    let conn = pool.get()?;
    let changed = tags_db_operations::update_tag(&conn, tag_id, &tag.name, &tag.slug, tag.description.as_deref())
        .map_err(|e| conflict_on_unique(e, DUPLICATE_TAG))?;
    if changed == 0 {
        return Err(AppError::NotFound("Tag"));
    }

    // Post listings filter on tag slugs.
    cache::invalidate(state, &[CacheResource::Tags, CacheResource::Posts]);
    tags_db_operations::read_tag(&conn, tag_id)?.ok_or(AppError::NotFound("Tag"))
}

pub fn delete_tag(pool: &DbPool, state: &AppState, tag_id: i64) -> AppResult<()> {
    let conn = pool.get()?;
    if tags_db_operations::delete_tag(&conn, tag_id)? == 0 {
        return Err(AppError::NotFound("Tag"));
    }
    log::info!("Deleted tag {}", tag_id);
    cache::invalidate(state, &[CacheResource::Tags, CacheResource::Posts]);
    Ok(())
}
