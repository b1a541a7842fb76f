mod request;
mod response;
mod wrapper;

pub use request::*;
pub use response::*;
pub use wrapper::*;

use serde::{Deserialize, Serialize};
use validator::Validate;

pub const MAX_PAGE_LIMIT: u32 = 100;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ArtSortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Name,
    Likes,
    Views,
}

impl ArtSortField {
    pub fn column(self) -> &'static str {
        match self {
            ArtSortField::CreatedAt => "arts.created_at",
            ArtSortField::UpdatedAt => "arts.updated_at",
            ArtSortField::Name => "arts.name",
            ArtSortField::Likes => "arts.likes",
            ArtSortField::Views => "arts.views",
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortType {
    Asc,
    #[default]
    Desc,
}

impl SortType {
    pub fn keyword(self) -> &'static str {
        match self {
            SortType::Asc => "ASC",
            SortType::Desc => "DESC",
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ArtQueryParams {
    #[serde(default = "get_default_page")]
    pub page: u32,
    #[serde(default = "get_default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub sort_by: ArtSortField,
    #[serde(default)]
    pub sort_type: SortType,
    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, Validate)]
pub struct PageParams {
    #[serde(default = "get_default_page")]
    pub page: u32,
    #[serde(default = "get_default_limit")]
    pub limit: u32,
}

/// A page request with `page >= 1` and `limit` clamped to `1..=MAX_PAGE_LIMIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    pub fn new(page: u32, limit: u32) -> Self {
        Page {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn offset(self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }

    pub fn limit(self) -> i64 {
        i64::from(self.limit)
    }
}

impl From<PageParams> for Page {
    fn from(PageParams { page, limit }: PageParams) -> Self {
        Page::new(page, limit)
    }
}

impl ArtQueryParams {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }

    /// The free-text filter, ignoring blank input.
    pub fn search(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|query| !query.is_empty())
    }
}

fn get_default_page() -> u32 {
    1
}

fn get_default_limit() -> u32 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_is_clamped() {
        assert_eq!(Page::new(0, 0), Page { page: 1, limit: 1 });
        assert_eq!(Page::new(3, 500).limit, MAX_PAGE_LIMIT);
        assert_eq!(Page::new(2, 10).offset(), 10);
    }

    #[test]
    fn sort_params_deserialize_from_camel_case() {
        let params: ArtQueryParams =
            serde_json::from_str(r#"{"sortBy":"views","sortType":"asc","userId":4}"#).unwrap();
        assert_eq!(params.sort_by, ArtSortField::Views);
        assert_eq!(params.sort_type, SortType::Asc);
        assert_eq!(params.user_id, Some(4));
        assert_eq!(params.page().limit, 10);
        assert!(serde_json::from_str::<ArtQueryParams>(r#"{"sortBy":"password"}"#).is_err());
    }
}
