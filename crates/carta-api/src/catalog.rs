use crate::StorefrontApi;
use carta_core::CartaResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Banner {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Brochure {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub valid_from: Option<String>,
    #[serde(default)]
    pub valid_to: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Product {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub old_price: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PromoCode {
    pub id: i64,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub valid_to: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Shop {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct PageMeta {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Paginated<T> {
    #[serde(default)]
    pub data: Vec<T>,
    #[serde(default)]
    pub meta: PageMeta,
}

#[derive(Debug, Clone)]
pub struct PageQuery {
    pub page: u32,
    pub limit: u32,
    pub category: Option<String>,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 30,
            category: None,
        }
    }
}

impl StorefrontApi {
    pub fn banners(&self) -> CartaResult<Vec<Banner>> {
        self.get_json("/banners", &[], None)
    }

    pub fn banner_by_id(&self, id: i64) -> CartaResult<Banner> {
        self.get_json("/banners", &[("id", id.to_string())], None)
    }

    pub fn brochures(&self) -> CartaResult<Vec<Brochure>> {
        self.get_json("/brochures", &[], None)
    }

    pub fn brochure_by_id(&self, id: i64) -> CartaResult<Brochure> {
        self.get_json("/brochures", &[("id", id.to_string())], None)
    }

    pub fn shops(&self) -> CartaResult<Vec<Shop>> {
        self.get_json("/shops", &[], None)
    }

    pub fn shop_by_id(&self, id: i64) -> CartaResult<Shop> {
        self.get_json("/shops", &[("id", id.to_string())], None)
    }

    pub fn products(&self, query: &PageQuery) -> CartaResult<Paginated<Product>> {
        self.get_json("/products", &paged_params(query), None)
    }

    pub fn home_products(&self, limit: u32, category: Option<&str>) -> CartaResult<Vec<Product>> {
        let mut params = vec![("mode", "home".to_string()), ("limit", limit.to_string())];
        if let Some(category) = category {
            params.push(("category", category.to_string()));
        }

        self.get_json("/products", &params, None)
    }

    pub fn product_by_id(&self, id: i64) -> CartaResult<Product> {
        self.get_json("/products", &[("id", id.to_string())], None)
    }

    pub fn promo_codes(&self, query: &PageQuery) -> CartaResult<Paginated<PromoCode>> {
        self.get_json("/promocodes", &paged_params(query), None)
    }

    pub fn promo_code_by_id(&self, id: i64) -> CartaResult<PromoCode> {
        self.get_json("/promocodes", &[("id", id.to_string())], None)
    }
}

fn paged_params(query: &PageQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("mode", "all".to_string()),
        ("page", query.page.to_string()),
        ("limit", query.limit.to_string()),
    ];

    if let Some(category) = query.category.as_deref() {
        params.push(("category", category.to_string()));
    }

    params
}
