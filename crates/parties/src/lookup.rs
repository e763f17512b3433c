//! Customer lookup by phone for the ordering conversation.
//!
//! Directory failures never reach the conversation: they are logged and turned
//! into "no such customer".

use std::sync::Arc;

use tracing::{instrument, warn};

use crate::customer::Customer;
use crate::directory::CustomerDirectory;
use crate::phone::{is_valid_phone, normalize_phone};

#[derive(Clone)]
pub struct CustomerLookup {
    directory: Arc<dyn CustomerDirectory>,
}

impl CustomerLookup {
    pub fn new(directory: Arc<dyn CustomerDirectory>) -> Self {
        Self { directory }
    }

    pub fn validate_phone(&self, phone: &str) -> bool {
        is_valid_phone(phone)
    }

    #[instrument(skip(self))]
    pub async fn get_by_phone(&self, phone: &str) -> Option<Customer> {
        let normalized = normalize_phone(phone);
        if normalized.is_empty() {
            return None;
        }

        match self.directory.find_by_normalized_phone(&normalized).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "customer lookup failed");
                None
            }
        }
    }
}
