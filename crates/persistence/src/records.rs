//! Business records touched by the tool executor

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// One sellable item in a tenant's catalog (a property, a service, a good).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub tenant_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub price: f64,
    pub currency: String,
    pub city: Option<String>,
    pub available: bool,
}

/// Bounded, tenant-scoped catalog query built by the tool executor.
///
/// Price bounds are inclusive. `limit` is always capped by the executor
/// before the query reaches a store.
#[derive(Debug, Clone, Default)]
pub struct CatalogQuery {
    pub category: Option<String>,
    pub city: Option<String>,
    pub keywords: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub limit: usize,
}

impl CatalogQuery {
    /// Whether an item satisfies every filter of this query.
    pub fn matches(&self, item: &CatalogItem) -> bool {
        if !item.available {
            return false;
        }
        if let Some(category) = &self.category {
            if !item.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if let Some(city) = &self.city {
            match &item.city {
                Some(item_city) if item_city.eq_ignore_ascii_case(city) => {}
                _ => return false,
            }
        }
        if let Some(keywords) = &self.keywords {
            let needle = keywords.to_lowercase();
            let haystack = format!("{} {}", item.title, item.description).to_lowercase();
            if !haystack.contains(&needle) {
                return false;
            }
        }
        if let Some(min) = self.min_price {
            if item.price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if item.price > max {
                return false;
            }
        }
        true
    }
}

/// Status of a booked appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Cancelled,
}

/// A booked appointment, created in-call by the tool executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub tenant_id: String,
    /// Conversation that produced the booking; part of the idempotency key.
    pub conversation_id: String,
    pub prospect_id: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub scheduled_at: NaiveDateTime,
    pub duration_minutes: u32,
    pub service_type: String,
    pub notes: String,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    pub fn date(&self) -> NaiveDate {
        self.scheduled_at.date()
    }
}

/// A counterparty record resolved or created from a call's caller address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prospect {
    pub id: String,
    pub tenant_id: String,
    pub phone: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(price: f64, category: &str, city: &str) -> CatalogItem {
        CatalogItem {
            id: "item-1".to_string(),
            tenant_id: "tenant-1".to_string(),
            title: "Appartement T3 lumineux".to_string(),
            description: "Trois pièces proche du centre".to_string(),
            category: category.to_string(),
            price,
            currency: "EUR".to_string(),
            city: Some(city.to_string()),
            available: true,
        }
    }

    #[test]
    fn test_query_price_bounds_inclusive() {
        let query = CatalogQuery {
            min_price: Some(100.0),
            max_price: Some(200.0),
            limit: 10,
            ..Default::default()
        };
        assert!(query.matches(&item(100.0, "real_estate", "Paris")));
        assert!(query.matches(&item(200.0, "real_estate", "Paris")));
        assert!(!query.matches(&item(99.9, "real_estate", "Paris")));
        assert!(!query.matches(&item(200.1, "real_estate", "Paris")));
    }

    #[test]
    fn test_query_keywords_match_title_or_description() {
        let query = CatalogQuery {
            keywords: Some("centre".to_string()),
            limit: 10,
            ..Default::default()
        };
        assert!(query.matches(&item(150.0, "real_estate", "Paris")));

        let query = CatalogQuery {
            keywords: Some("piscine".to_string()),
            limit: 10,
            ..Default::default()
        };
        assert!(!query.matches(&item(150.0, "real_estate", "Paris")));
    }

    #[test]
    fn test_query_ignores_unavailable_items() {
        let mut it = item(150.0, "real_estate", "Paris");
        it.available = false;
        assert!(!CatalogQuery::default().matches(&it));
    }
}
