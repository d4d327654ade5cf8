//! Booking domain types returned by the scraper service.

use serde::{Deserialize, Serialize};

/// One bookable service and its price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceItem {
    pub id: String,
    pub name: String,
    /// Price as displayed by the booking site, e.g. "R$ 45,00".
    pub price: String,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

/// An open appointment slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub service_id: String,
    /// ISO date, `YYYY-MM-DD`.
    pub date: String,
    /// Local time, `HH:MM`.
    pub time: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_item_without_duration() {
        let item: ServiceItem =
            serde_json::from_str(r#"{"id":"cut","name":"Haircut","price":"R$ 45,00"}"#).unwrap();
        assert_eq!(item.duration_minutes, None);
        assert_eq!(item.name, "Haircut");
    }
}
