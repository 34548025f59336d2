//! Address types.

use crate::ids::{AddressId, UserId};
use serde::{Deserialize, Serialize};

/// A saved postal address owned by a user.
///
/// Owned by the address subsystem; checkout only checks that the row exists
/// and belongs to the ordering user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Address {
    /// Address ID.
    pub id: AddressId,
    /// Owning user.
    pub user_id: UserId,
    /// Recipient full name.
    pub full_name: String,
    /// Address line 1.
    pub address1: String,
    /// Address line 2 (apt, suite, etc.).
    #[serde(default)]
    pub address2: Option<String>,
    /// City.
    pub city: String,
    /// State/province code (e.g., "CA").
    #[serde(default)]
    pub province_code: Option<String>,
    /// Country code (e.g., "US").
    pub country_code: String,
    /// Postal/ZIP code.
    pub zip: String,
}

impl Address {
    /// Create a new address.
    pub fn new(
        id: AddressId,
        user_id: UserId,
        full_name: impl Into<String>,
        address1: impl Into<String>,
        city: impl Into<String>,
        country_code: impl Into<String>,
        zip: impl Into<String>,
    ) -> Self {
        Self {
            id,
            user_id,
            full_name: full_name.into(),
            address1: address1.into(),
            address2: None,
            city: city.into(),
            province_code: None,
            country_code: country_code.into(),
            zip: zip.into(),
        }
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    /// Format as single line.
    pub fn one_line(&self) -> String {
        let mut parts = vec![self.address1.as_str()];
        if let Some(ref addr2) = self.address2 {
            parts.push(addr2);
        }
        parts.push(&self.city);
        if let Some(ref province) = self.province_code {
            parts.push(province);
        }
        parts.push(&self.zip);
        parts.push(&self.country_code);
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_ownership_and_formatting() {
        let mut addr = Address::new(
            AddressId::new("addr-1"),
            UserId::new("user-1"),
            "Jane Smith",
            "456 Oak Ave",
            "Los Angeles",
            "US",
            "90001",
        );
        addr.province_code = Some("CA".to_string());

        assert!(addr.is_owned_by(&UserId::new("user-1")));
        assert!(!addr.is_owned_by(&UserId::new("user-2")));
        assert_eq!(addr.one_line(), "456 Oak Ave, Los Angeles, CA, 90001, US");
    }
}
