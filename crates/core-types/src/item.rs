use crate::error::CoreError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// A persisted catalog entry, as read back from the `item` table.
///
/// `id`, `created_at` and `updated_at` are assigned by the store when the row
/// is inserted; nothing in this workspace ever changes them afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Item {
    #[sqlx(rename = "item_id")]
    pub id: u64,
    #[sqlx(rename = "item_name")]
    pub name: String,
    #[sqlx(rename = "item_price")]
    pub price: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// The caller-side value handed to the write path.
///
/// Prices are expected to be non-negative but are not validated here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub price: i32,
}

impl NewItem {
    pub fn new(name: impl Into<String>, price: i32) -> Self {
        Self {
            name: name.into(),
            price,
        }
    }
}

impl From<&Item> for NewItem {
    fn from(item: &Item) -> Self {
        Self::new(item.name.clone(), item.price)
    }
}

impl fmt::Display for NewItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.price)
    }
}

/// Parses the `name=price` form used on the command line.
///
/// The split happens on the last `=`, so names may themselves contain `=`.
impl FromStr for NewItem {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, price) = s.rsplit_once('=').ok_or_else(|| {
            CoreError::InvalidInput("item".to_string(), format!("expected NAME=PRICE, got '{s}'"))
        })?;
        if name.is_empty() {
            return Err(CoreError::InvalidInput(
                "item".to_string(),
                "name must not be empty".to_string(),
            ));
        }
        let price = price.trim().parse::<i32>().map_err(|e| {
            CoreError::InvalidInput("price".to_string(), format!("'{price}': {e}"))
        })?;
        Ok(Self::new(name, price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_and_price() {
        let item: NewItem = "Galaxy=990".parse().unwrap();
        assert_eq!(item, NewItem::new("Galaxy", 990));
    }

    #[test]
    fn splits_on_last_equals_sign() {
        let item: NewItem = "a=b=5".parse().unwrap();
        assert_eq!(item.name, "a=b");
        assert_eq!(item.price, 5);
    }

    #[test]
    fn rejects_missing_price() {
        assert!(matches!(
            "iphone".parse::<NewItem>(),
            Err(CoreError::InvalidInput(field, _)) if field == "item"
        ));
        assert!("iphone=abc".parse::<NewItem>().is_err());
        assert!("=10".parse::<NewItem>().is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        let item = NewItem::new("iPad", 500);
        assert_eq!(item.to_string(), "iPad=500");
        assert_eq!(item.to_string().parse::<NewItem>().unwrap(), item);
    }
}
