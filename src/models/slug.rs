//! URL-safe identifiers derived from titles and tag names.

/// Lowercases `input`, keeps ASCII letters and digits, and joins the
/// remaining runs with single hyphens.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;

    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

/// Appends `-2`, `-3`, ... to `base` until `taken` reports a free slug.
pub fn dedupe_slug<F>(base: &str, mut taken: F) -> rusqlite::Result<String>
where
    F: FnMut(&str) -> rusqlite::Result<bool>,
{
    if !taken(base)? {
        return Ok(base.to_string());
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}-{}", base, n);
        if !taken(&candidate)? {
            return Ok(candidate);
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Rust   &  Actix -- 2024 "), "rust-actix-2024");
        assert_eq!(slugify("Crème brûlée"), "cr-me-br-l-e");
        assert_eq!(slugify("!!!"), "untitled");
    }

    #[test]
    fn dedupe_appends_counter() {
        let existing = ["intro", "intro-2"];
        let slug = dedupe_slug("intro", |s| Ok(existing.contains(&s))).unwrap();
        assert_eq!(slug, "intro-3");
        let slug = dedupe_slug("fresh", |s| Ok(existing.contains(&s))).unwrap();
        assert_eq!(slug, "fresh");
    }
}
