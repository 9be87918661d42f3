use serde::{Deserialize, Serialize};

use super::repo::{Ad, AdField, AdFilter, NewAd};
use crate::db::Pagination;
use crate::error::AppError;

/// Query string of `GET /ads`.
#[derive(Debug, Deserialize)]
pub struct AdListQuery {
    pub category: Option<String>,
    pub location: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    10
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl AdListQuery {
    pub fn split(self) -> (AdFilter, Pagination) {
        let page = Pagination {
            limit: self.limit,
            offset: self.offset,
        }
        .normalized();
        let filter = AdFilter {
            category: non_blank(self.category),
            location: non_blank(self.location),
        };
        (filter, page)
    }
}

#[derive(Debug, Serialize)]
pub struct AdListResponse {
    pub ads: Vec<Ad>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateAdRequest {
    pub title: String,
    pub price: f64,
    pub category_id: i64,
    pub price_unit_id: i64,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub schedule: String,
}

fn check_title(title: String) -> Result<String, AppError> {
    let title = title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::bad_request("title is required"));
    }
    Ok(title)
}

fn check_price(price: f64) -> Result<f64, AppError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(AppError::bad_request("price must be greater than 0"));
    }
    Ok(price)
}

impl TryFrom<CreateAdRequest> for NewAd {
    type Error = AppError;

    fn try_from(req: CreateAdRequest) -> Result<Self, Self::Error> {
        Ok(NewAd {
            title: check_title(req.title)?,
            price: check_price(req.price)?,
            category_id: req.category_id,
            price_unit_id: req.price_unit_id,
            location: req.location.trim().to_string(),
            schedule: req.schedule.trim().to_string(),
        })
    }
}

/// PATCH /my-ads/{id} body.
#[derive(Debug, Default, Deserialize)]
pub struct PatchAdRequest {
    pub title: Option<String>,
    pub price: Option<f64>,
    pub category_id: Option<i64>,
    pub price_unit_id: Option<i64>,
    pub location: Option<String>,
    pub schedule: Option<String>,
}

impl PatchAdRequest {
    pub fn into_fields(self) -> Result<Vec<AdField>, AppError> {
        let mut fields = Vec::new();
        if let Some(v) = self.title {
            fields.push(AdField::Title(check_title(v)?));
        }
        if let Some(v) = self.price {
            fields.push(AdField::Price(check_price(v)?));
        }
        if let Some(v) = self.category_id {
            fields.push(AdField::CategoryId(v));
        }
        if let Some(v) = self.price_unit_id {
            fields.push(AdField::PriceUnitId(v));
        }
        if let Some(v) = self.location {
            fields.push(AdField::Location(v.trim().to_string()));
        }
        if let Some(v) = self.schedule {
            fields.push(AdField::Schedule(v.trim().to_string()));
        }
        if fields.is_empty() {
            return Err(AppError::bad_request("no fields to update"));
        }
        Ok(fields)
    }
}
