//! Intent classification.
//!
//! Pure function of the trimmed message and the current dialog state. Matching
//! is exact after trimming and Unicode lower-casing; there is no fuzzy
//! matching.

use serde::{Deserialize, Serialize};

use glasserp_parties::is_valid_phone;

use crate::state::DialogState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    PlaceOrder,
    PhoneNumber,
    AddOrderDetail,
    FinishOrder,
    ConfirmOrder,
    ContactStaff,
    EndStaffContact,
    Cancel,
    Unknown,
}

pub const PLACE_ORDER_KEYWORD: &str = "Đặt hàng";
pub const FINISH_ORDER_KEYWORD: &str = "Kết thúc";
pub const CONTACT_STAFF_KEYWORD: &str = "Nhân viên";

const CANCEL_KEYWORDS: &[&str] = &["Hủy", "Cancel", "Thôi"];
const CONFIRM_KEYWORDS: &[&str] = &["Xác nhận", "Ok", "Đồng ý", "Đúng", "Có", "Yes", "Confirm"];
const END_STAFF_KEYWORDS: &[&str] = &["Kết thúc", "Quay lại", "Thoát", "Exit"];

/// Case-insensitive exact comparison after trimming.
pub fn is_keyword(message: &str, keyword: &str) -> bool {
    message.trim().to_lowercase() == keyword.to_lowercase()
}

fn is_any_keyword(message: &str, keywords: &[&str]) -> bool {
    let lowered = message.trim().to_lowercase();
    keywords.iter().any(|k| lowered == k.to_lowercase())
}

pub fn classify(message: &str, state: DialogState) -> Intent {
    let message = message.trim();

    if is_any_keyword(message, CANCEL_KEYWORDS) {
        return Intent::Cancel;
    }

    match state {
        DialogState::WaitingForPhone => {
            if is_valid_phone(message) {
                Intent::PhoneNumber
            } else {
                Intent::Unknown
            }
        }
        DialogState::WaitingForProductInfo => {
            if is_keyword(message, FINISH_ORDER_KEYWORD) {
                Intent::FinishOrder
            } else {
                Intent::AddOrderDetail
            }
        }
        DialogState::Confirming => {
            if is_any_keyword(message, CONFIRM_KEYWORDS) {
                Intent::ConfirmOrder
            } else {
                Intent::AddOrderDetail
            }
        }
        DialogState::ContactingStaff => {
            if is_any_keyword(message, END_STAFF_KEYWORDS) {
                Intent::EndStaffContact
            } else {
                Intent::ContactStaff
            }
        }
        DialogState::New
        | DialogState::Completed
        | DialogState::Cancelled
        | DialogState::Inquiry
        | DialogState::Ordering => {
            if is_keyword(message, PLACE_ORDER_KEYWORD) {
                Intent::PlaceOrder
            } else if is_keyword(message, CONTACT_STAFF_KEYWORD) {
                Intent::ContactStaff
            } else {
                Intent::Unknown
            }
        }
    }
}
