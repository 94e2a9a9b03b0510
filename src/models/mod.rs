use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod db_operations;
pub mod permissions;
pub mod slug;
pub mod workflow;

/// Implements text (de)serialization for enums persisted as TEXT columns.
macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_uppercase().as_str() {
                    $($text => Ok($ty::$variant),)+
                    other => Err(format!("Unknown {} '{}'.", stringify!($ty), other)),
                }
            }
        }

        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value.as_str()?.parse().map_err(|_| FromSqlError::InvalidType)
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Reader,
    Author,
    Admin,
}

text_enum!(Role {
    Reader => "READER",
    Author => "AUTHOR",
    Admin => "ADMIN",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostStatus {
    Draft,
    PendingApproval,
    Published,
    Rejected,
}

text_enum!(PostStatus {
    Draft => "DRAFT",
    PendingApproval => "PENDING_APPROVAL",
    Published => "PUBLISHED",
    Rejected => "REJECTED",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

text_enum!(RequestStatus {
    Pending => "PENDING",
    Approved => "APPROVED",
    Rejected => "REJECTED",
});

#[derive(Debug, Serialize, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
pub struct TagWithCount {
    #[serde(flatten)]
    pub tag: Tag,
    pub post_count: i64,
}

#[derive(Debug, Serialize, Clone)]
pub struct Post {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
    pub status: PostStatus,
    pub views: i64,
    pub author_id: i64,
    pub author_name: String,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tags: Vec<Tag>,
}

// Summaries are cached for public listings, so they leave out the view counter.
#[derive(Debug, Serialize, Clone)]
pub struct PostSummary {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
    pub status: PostStatus,
    pub author_id: i64,
    pub author_name: String,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Clone)]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub author_id: i64,
    pub author_name: String,
    pub post_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Clone)]
pub struct PublishRequest {
    pub id: i64,
    pub post_id: String,
    pub post_title: String,
    pub author_id: i64,
    pub author_name: String,
    pub status: RequestStatus,
    pub message: Option<String>,
    pub reviewer_message: Option<String>,
    pub reviewer_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EditLogEntry {
    pub edit_number: u32,
    pub editor_id: i64,
    pub edited_at: DateTime<Utc>,
    /// Set when an admin edited a post outside the author workflow.
    pub admin_override: bool,
}

#[derive(Debug, Serialize, Clone)]
pub struct MediaUpload {
    pub id: String,
    pub user_id: i64,
    pub file_path: String,
    pub mime_type: String,
    pub file_size: i64,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse { success: true, data }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct Pagination {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl Pagination {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    /// Returns `(limit, offset)` with the page numbered from 1. The offset
    /// is widened to SQLite's integer type so any `u32` page is in range.
    pub fn limit_offset(&self) -> (u32, i64) {
        let limit = self.limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT);
        let page = self.page.unwrap_or(1).max(1);
        (limit, (i64::from(page) - 1) * i64::from(limit))
    }
}
