//! Parties domain module (ERP customers as seen by the ordering channel).
//!
//! The customer CRUD itself lives in the ERP; this crate only carries what the
//! chatbot needs: the customer shape, phone-number rules and a lookup-by-phone
//! directory.

pub mod customer;
pub mod directory;
pub mod lookup;
pub mod phone;

pub use customer::{ContactInfo, Customer};
pub use directory::{CustomerDirectory, DirectoryError, InMemoryCustomerDirectory};
pub use lookup::CustomerLookup;
pub use phone::{PhoneNumber, is_valid_phone, normalize_phone};
