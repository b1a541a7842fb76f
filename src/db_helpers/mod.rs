mod art_helpers;
mod comment_helpers;
mod like_helpers;
mod user_helpers;

pub use art_helpers::*;
pub use comment_helpers::*;
pub use like_helpers::*;
pub use user_helpers::*;

/// Millisecond-precision timestamp expression matching the column defaults.
pub(crate) const NOW: &str = "strftime('%Y-%m-%d %H:%M:%f', 'now')";

pub(crate) const ART_SELECT: &str = r#"
    SELECT arts.id,
           arts.owner_id,
           arts.name,
           arts.content,
           arts.caption,
           arts.likes,
           arts.views,
           arts.is_published,
           arts.created_at,
           arts.updated_at,
           users.username AS owner_username,
           users.avatar   AS owner_avatar
    FROM   arts
           JOIN users
             ON users.id = arts.owner_id
"#;

pub(crate) const COMMENT_SELECT: &str = r#"
    SELECT comments.id,
           comments.owner_id,
           comments.art_id,
           comments.content,
           comments.likes,
           comments.created_at,
           comments.updated_at,
           users.username AS owner_username,
           users.avatar   AS owner_avatar
    FROM   comments
           JOIN users
             ON users.id = comments.owner_id
"#;

/// Builds the `SET` list of a partial update, skipping absent values.
pub(crate) struct QueryBuilder {
    query: String,
    params: Vec<String>,
    separator: &'static str,
    counter: usize,
}

impl QueryBuilder {
    pub(crate) fn new(initial: impl Into<String>, separator: &'static str) -> Self {
        Self {
            query: initial.into(),
            params: Vec::new(),
            separator,
            counter: 0,
        }
    }

    fn push_separator(&mut self) {
        if self.counter > 0 {
            self.query.push_str(self.separator);
        }
    }

    pub(crate) fn add_param(mut self, column: &str, param: Option<String>) -> Self {
        if let Some(value) = param {
            self.push_separator();
            self.query.push_str(column);
            self.query.push_str(" = ?");
            self.params.push(value);
            self.counter += 1;
        }
        self
    }

    /// Appends an assignment with no bound value. Only emitted when at least
    /// one parameter was added, so a no-op update stays a no-op.
    pub(crate) fn touch(mut self, assignment: &str) -> Self {
        if self.counter > 0 {
            self.query.push_str(self.separator);
            self.query.push_str(assignment);
        }
        self
    }

    pub(crate) fn build(self, tail: &str) -> Option<(String, Vec<String>)> {
        if self.counter == 0 {
            return None;
        }
        Some((format!("{}{}", self.query, tail), self.params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_only_present_assignments() {
        let (query, params) = QueryBuilder::new("UPDATE arts SET ", ", ")
            .add_param("name", Some("sunset".to_owned()))
            .add_param("caption", None)
            .add_param("content", Some("https://img/1.png".to_owned()))
            .touch("updated_at = now()")
            .build(" WHERE id = ?")
            .unwrap();
        assert_eq!(
            query,
            "UPDATE arts SET name = ?, content = ?, updated_at = now() WHERE id = ?"
        );
        assert_eq!(params, vec!["sunset", "https://img/1.png"]);
    }

    #[test]
    fn empty_update_builds_nothing() {
        let builder = QueryBuilder::new("UPDATE users SET ", ", ")
            .add_param("email", None)
            .touch("updated_at = now()");
        assert!(builder.build(" WHERE id = ?").is_none());
    }
}
