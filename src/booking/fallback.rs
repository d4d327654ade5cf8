//! Static data served when the booking site and the cache are both unavailable.

use crate::booking::types::{ServiceItem, Slot};
use crate::fallback::StaticFallbackCatalog;

fn item(id: &str, name: &str, price: &str, minutes: u32) -> ServiceItem {
    ServiceItem {
        id: id.to_string(),
        name: name.to_string(),
        price: price.to_string(),
        duration_minutes: Some(minutes),
    }
}

/// The shop's published menu. Kept in sync with the price board by hand.
pub fn service_catalog() -> StaticFallbackCatalog<Vec<ServiceItem>> {
    StaticFallbackCatalog::new(vec![
        item("haircut", "Haircut", "R$ 45,00", 30),
        item("beard", "Beard trim", "R$ 35,00", 30),
        item("haircut-beard", "Haircut + beard", "R$ 70,00", 60),
        item("kids", "Kids haircut", "R$ 35,00", 30),
        item("eyebrow", "Eyebrow", "R$ 15,00", 15),
        item("hydration", "Hair hydration", "R$ 40,00", 30),
    ])
}

/// No slots are invented; the chat layer tells the customer to check back.
pub fn availability() -> StaticFallbackCatalog<Vec<Slot>> {
    StaticFallbackCatalog::new(Vec::new())
}
