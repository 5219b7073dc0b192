// src/common/pagination.rs

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Parâmetros `?page=&limit=` comuns às listagens
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageParams {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self { page, limit }
    }

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        // Páginas absurdas viram um offset enorme, não um overflow
        (self.page() - 1).saturating_mul(self.limit())
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub pagination: PageMeta,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(items: Vec<T>, params: &PageParams, total: i64) -> Self {
        let limit = params.limit();
        Self {
            items,
            pagination: PageMeta {
                page: params.page(),
                limit,
                total,
                total_pages: total.saturating_add(limit - 1) / limit,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_missing() {
        let params = PageParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn limit_is_clamped_and_page_floor_is_one() {
        let params = PageParams { page: Some(0), limit: Some(500) };
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), MAX_PAGE_SIZE);

        let params = PageParams { page: Some(3), limit: Some(10) };
        assert_eq!(params.offset(), 20);
    }

    #[test]
    fn total_pages_rounds_up() {
        let params = PageParams { page: Some(1), limit: Some(20) };
        let page: Paginated<u8> = Paginated::new(vec![], &params, 41);
        assert_eq!(page.pagination.total_pages, 3);

        let empty: Paginated<u8> = Paginated::new(vec![], &params, 0);
        assert_eq!(empty.pagination.total_pages, 0);
    }

    #[test]
    fn huge_page_number_saturates_offset() {
        let params: PageParams = serde_json::from_str(r#"{"page":9223372036854775807,"limit":100}"#).unwrap();
        assert_eq!(params.offset(), i64::MAX);

        let params = PageParams::new(Some(i64::MAX), None);
        assert!(params.offset() >= 0);
    }
}
