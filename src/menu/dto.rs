use serde::Deserialize;
use uuid::Uuid;

use crate::{
    menu::repo::MenuCategory,
    response::{default_menu_limit, default_page, PageQuery},
};

#[derive(Debug, Deserialize)]
pub struct MenuListQuery {
    pub category: Option<MenuCategory>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_menu_limit")]
    pub limit: i64,
}

impl MenuListQuery {
    pub fn page(&self) -> PageQuery {
        PageQuery::new(self.page, self.limit)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuSearchQuery {
    #[serde(default)]
    pub q: String,
    pub restaurant_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMenuItemRequest {
    pub restaurant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: MenuCategory,
    pub price: f64,
    #[serde(default)]
    pub vegetarian: bool,
    #[serde(default)]
    pub vegan: bool,
    #[serde(default)]
    pub spicy_level: i16,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMenuItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<MenuCategory>,
    pub price: Option<f64>,
    pub vegetarian: Option<bool>,
    pub vegan: Option<bool>,
    pub spicy_level: Option<i16>,
    pub available: Option<bool>,
}
