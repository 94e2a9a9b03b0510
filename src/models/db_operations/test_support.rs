use rusqlite::Connection;

use crate::models::db_operations::{posts_db_operations, users_db_operations};
use crate::models::{Post, Role, User};
use crate::setup::db_setup::setup_database;

// Any valid bcrypt string works for rows that never log in.
const DUMMY_HASH: &str = "$2b$04$abcdefghijklmnopqrstuuX1kHAdH2j6mEkq7lq3gtk6nR7Zk1Zxu";

pub fn test_conn() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
    setup_database(&mut conn).unwrap();
    conn
}

pub fn seed_user(conn: &Connection, email: &str, role: Role) -> User {
    let name = email.split('@').next().unwrap_or(email);
    let id = users_db_operations::insert_user(conn, email, name, DUMMY_HASH, role).unwrap();
    users_db_operations::read_user_by_id(conn, id).unwrap().unwrap()
}

pub fn seed_post(conn: &Connection, author: &User, title: &str) -> Post {
    let new_post = posts_db_operations::NewPost {
        title: title.to_string(),
        content: format!("Body of {title}"),
        excerpt: None,
        cover_image: None,
        tag_ids: Vec::new(),
    };
    let id = posts_db_operations::create_post(conn, author.id, &new_post).unwrap();
    posts_db_operations::read_post(conn, &id).unwrap().unwrap()
}
