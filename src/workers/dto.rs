use serde::{Deserialize, Serialize};

use crate::db::Pagination;
use crate::error::AppError;
use crate::users::repo_types::WorkerView;

/// Directory entry for one worker.
#[derive(Debug, Serialize)]
pub struct WorkerResponse {
    pub user_id: i64,
    pub name: String,
    pub categories: Vec<String>,
    pub exp_years: Option<i32>,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub is_busy: bool,
    pub location: Option<String>,
    pub schedule: Option<String>,
}

impl From<WorkerView> for WorkerResponse {
    fn from(v: WorkerView) -> Self {
        Self {
            user_id: v.profile.user_id,
            name: v.name,
            categories: v.categories,
            exp_years: v.profile.exp_years,
            description: v.profile.description,
            phone: v.profile.phone,
            is_busy: v.profile.is_busy,
            location: v.profile.location,
            schedule: v.profile.schedule,
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct PageInfo {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub page: i64,
    pub pages: i64,
}

impl PageInfo {
    pub fn new(page: Pagination, total: i64) -> Self {
        Self {
            total,
            limit: page.limit,
            offset: page.offset,
            page: page.page(),
            pages: page.pages(total),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WorkerListResponse {
    pub workers: Vec<WorkerResponse>,
    pub pagination: PageInfo,
}

#[derive(Debug, Deserialize)]
pub struct CategoryNamesRequest {
    #[serde(default)]
    pub category_names: Vec<String>,
}

impl CategoryNamesRequest {
    /// Trimmed, non-blank names. An empty list is a client error.
    pub fn into_names(self) -> Result<Vec<String>, AppError> {
        let names: Vec<String> = self
            .category_names
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        if names.is_empty() {
            return Err(AppError::bad_request("category_names is required"));
        }
        Ok(names)
    }
}
