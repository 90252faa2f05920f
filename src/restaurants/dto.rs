use serde::Deserialize;

use crate::{
    response::{default_limit, default_page, PageQuery},
    restaurants::repo::RestaurantAddress,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub cuisine: String,
    #[serde(default)]
    pub min_rating: f64,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

impl RestaurantQuery {
    pub fn page(&self) -> PageQuery {
        PageQuery::new(self.page, self.limit)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRestaurantRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub cuisines: Vec<String>,
    pub address: RestaurantAddress,
    pub phone: Option<String>,
    #[serde(default = "default_delivery_fee")]
    pub delivery_fee: f64,
    #[serde(default = "default_min_order")]
    pub min_order: f64,
}

fn default_delivery_fee() -> f64 {
    2.99
}
fn default_min_order() -> f64 {
    10.0
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRestaurantRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub cuisines: Option<Vec<String>>,
    pub address: Option<RestaurantAddress>,
    pub phone: Option<String>,
    pub delivery_fee: Option<f64>,
    pub min_order: Option<f64>,
    pub is_open: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub active: bool,
}
