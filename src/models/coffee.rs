use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Coffee {
    pub id: i32,
    pub name: String,
    pub brand: String,
    pub recommendations: i32,
}

/// The wire shape of a coffee: flavors are exposed as plain names, not full
/// flavor records.
#[derive(Debug, Clone, Serialize)]
pub struct CoffeePublic {
    pub id: i32,
    pub name: String,
    pub brand: String,
    pub recommendations: i32,
    pub flavors: Vec<String>,
}

impl CoffeePublic {
    pub fn from_coffee(coffee: Coffee, flavors: Vec<String>) -> Self {
        CoffeePublic {
            id: coffee.id,
            name: coffee.name,
            brand: coffee.brand,
            recommendations: coffee.recommendations,
            flavors,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCoffeeRequest {
    pub name: String,
    pub brand: String,
    pub flavors: Vec<String>,
}

/// Partial update: omitted fields are left untouched; a supplied flavor
/// list replaces the prior set entirely.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCoffeeRequest {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub flavors: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PaginationQuery {
    #[validate(range(min = 0, message = "limit must not be negative"))]
    pub limit: Option<i64>,
    #[validate(range(min = 0, message = "offset must not be negative"))]
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_rejects_unknown_fields() {
        let result: Result<CreateCoffeeRequest, _> = serde_json::from_str(
            r#"{ "name": "n", "brand": "b", "flavors": [], "recommendations": 3 }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn create_request_requires_all_fields() {
        let result: Result<CreateCoffeeRequest, _> =
            serde_json::from_str(r#"{ "name": "n", "flavors": [] }"#);
        let message = result.unwrap_err().to_string();
        assert!(message.contains("brand"));
    }

    #[test]
    fn update_request_accepts_partial_bodies() {
        let update: UpdateCoffeeRequest = serde_json::from_str(r#"{ "brand": "b" }"#).unwrap();
        assert!(update.name.is_none());
        assert_eq!(update.brand.as_deref(), Some("b"));
        assert!(update.flavors.is_none());
    }

    #[test]
    fn pagination_rejects_negative_values() {
        let query = PaginationQuery {
            limit: Some(-1),
            offset: None,
        };
        assert!(query.validate().is_err());
    }
}
