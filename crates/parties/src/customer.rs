use serde::{Deserialize, Serialize};

use glasserp_core::{CustomerId, DomainError, DomainResult, Entity};

/// Contact information for a customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub phone: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
}

/// An ERP customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    id: CustomerId,
    name: String,
    contact: ContactInfo,
}

impl Customer {
    pub fn new(id: CustomerId, name: impl Into<String>, contact: ContactInfo) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("customer name cannot be empty"));
        }
        Ok(Self { id, name, contact })
    }

    pub fn id_typed(&self) -> CustomerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn phone(&self) -> Option<&str> {
        self.contact.phone.as_deref()
    }

    pub fn address(&self) -> Option<&str> {
        self.contact.address.as_deref()
    }
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_customer_name_is_rejected() {
        let err = Customer::new(CustomerId::new(), "   ", ContactInfo::default()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn accessors_expose_contact_fields() {
        let c = Customer::new(
            CustomerId::new(),
            "Công ty Kính Việt",
            ContactInfo {
                phone: Some("0912345678".into()),
                address: Some("12 Láng Hạ, Hà Nội".into()),
                email: None,
            },
        )
        .unwrap();
        assert_eq!(c.phone(), Some("0912345678"));
        assert_eq!(c.address(), Some("12 Láng Hạ, Hà Nội"));
        assert_eq!(c.name(), "Công ty Kính Việt");
    }
}
