use serde::{Deserialize, Serialize};

/// Standard success envelope: `{"status":"success", "message"?, "data"}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            status: "success",
            message: None,
            data,
        }
    }

    pub fn message(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "success",
            message: Some(message.into()),
            data,
        }
    }
}

/// List envelope with pagination metadata.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub status: &'static str,
    pub data: Vec<T>,
    pub pagination: PageMeta,
}

#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub total: i64,
    pub page: i64,
    pub pages: i64,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, total: i64, page: i64, limit: i64) -> Self {
        Self {
            status: "success",
            data,
            pagination: PageMeta {
                total,
                page,
                pages: pages_for(total, limit),
            },
        }
    }
}

fn pages_for(total: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

/// `?page=&limit=` pagination, 1-based. Filterful endpoints embed the same
/// two fields in their own query structs (serde_urlencoded cannot flatten
/// numeric fields) and convert with `PageQuery::new`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

impl PageQuery {
    pub fn new(page: i64, limit: i64) -> Self {
        Self { page, limit }
    }
}

pub fn default_page() -> i64 {
    1
}
pub fn default_limit() -> i64 {
    10
}
pub fn default_menu_limit() -> i64 {
    20
}

impl PageQuery {
    /// Clamped limit/offset for SQL. Page numbers below 1 behave as page 1.
    pub fn limit_offset(&self) -> (i64, i64) {
        let limit = self.limit.clamp(1, 100);
        let page = self.page.max(1);
        (limit, (page - 1) * limit)
    }

    pub fn page(&self) -> i64 {
        self.page.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_round_up() {
        assert_eq!(pages_for(0, 10), 0);
        assert_eq!(pages_for(10, 10), 1);
        assert_eq!(pages_for(11, 10), 2);
        assert_eq!(pages_for(9, 10), 1);
    }

    #[test]
    fn page_query_clamps() {
        let q = PageQuery { page: 0, limit: 500 };
        assert_eq!(q.limit_offset(), (100, 0));
        let q = PageQuery { page: 3, limit: 10 };
        assert_eq!(q.limit_offset(), (10, 20));
    }

    #[test]
    fn envelope_shape() {
        let body = serde_json::to_value(ApiResponse::message("Done", 7)).unwrap();
        assert_eq!(body["status"], "success");
        assert_eq!(body["message"], "Done");
        assert_eq!(body["data"], 7);

        let body = serde_json::to_value(Paginated::new(vec![1, 2], 12, 1, 10)).unwrap();
        assert_eq!(body["pagination"]["total"], 12);
        assert_eq!(body["pagination"]["pages"], 2);
    }
}
