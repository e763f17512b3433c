//! Bot reply texts (Vietnamese) and order rendering.

use rust_decimal::{Decimal, RoundingStrategy};

use glasserp_sales::ZaloOrder;

use crate::parser::ParsedItem;

pub const GREETING: &str = "Xin chào! Chào mừng bạn đến với VNG Glass.";

pub const HELP_MENU: &str = "Xin lỗi, tôi không hiểu ý bạn.\n\
Bạn có thể nhắn:\n\
• \"Đặt hàng\" để bắt đầu đặt hàng\n\
• \"Nhân viên\" để trò chuyện với nhân viên hỗ trợ\n\
• \"Hủy\" để hủy thao tác hiện tại";

pub const ERROR_MESSAGE: &str = "Xin lỗi, có lỗi xảy ra. Vui lòng thử lại sau.";

pub const UNSUPPORTED_EVENT: &str = "Xin lỗi, tôi chỉ có thể xử lý tin nhắn văn bản. Vui lòng gửi tin nhắn bằng chữ hoặc liên hệ nhân viên hỗ trợ.";

pub const CONTACT_SUPPORT: &str = "📞 Hotline: 1900-xxxx\n📧 Email: support@vngglass.com\n💬 Zalo: @vngglass_support";

pub const ASK_PHONE: &str = "Vui lòng nhập số điện thoại đã đăng ký với VNG Glass để bắt đầu đặt hàng.";

pub const INVALID_PHONE: &str = "Số điện thoại không hợp lệ. Vui lòng nhập số di động 10 chữ số (ví dụ: 0912345678) hoặc nhắn \"Hủy\" để dừng.";

pub const CUSTOMER_NOT_FOUND: &str = "Không tìm thấy khách hàng với số điện thoại này. Vui lòng kiểm tra lại hoặc nhắn \"Nhân viên\" để được hỗ trợ đăng ký.";

pub const PRODUCT_FORMAT_HINT: &str = "Vui lòng gửi thông tin sản phẩm theo mẫu:\n\
Mã sản phẩm - Loại - Rộng*Cao*Dày mm - Số lượng\n\
Ví dụ: EI90 MB 1000*2000*25mm 2\n\
Khi đã gửi xong, nhắn \"Kết thúc\".";

pub const PRODUCT_NOTED: &str = "Đã ghi nhận thông tin sản phẩm. Bạn có thể gửi thêm sản phẩm hoặc nhắn \"Kết thúc\" để xem lại đơn hàng.";

pub const NO_ORDER_HISTORY: &str = "Không tìm thấy thông tin đặt hàng trong cuộc trò chuyện. Vui lòng nhắn \"Đặt hàng\" để bắt đầu lại.";

pub const NO_PRODUCTS_RECOGNIZED: &str = "Chưa nhận diện được sản phẩm nào trong tin nhắn của bạn.";

pub const NO_ORDER_INFO: &str = "Chưa có thông tin đơn hàng để xác nhận. Vui lòng gửi thông tin sản phẩm rồi nhắn \"Kết thúc\".";

pub const CONFIRM_PROMPT: &str = "Nhắn \"Xác nhận\" để đặt hàng, gửi thêm sản phẩm để bổ sung, hoặc \"Hủy\" để hủy đơn.";

pub const CANCELLED: &str = "Đã hủy. Nhắn \"Đặt hàng\" bất cứ lúc nào để bắt đầu lại.";

pub const STAFF_CONNECTED: &str = "Bạn đã được kết nối với nhân viên hỗ trợ. Vui lòng để lại tin nhắn, nhân viên sẽ phản hồi sớm nhất. Nhắn \"Kết thúc\" để quay lại trợ lý tự động.";

pub const STAFF_ENDED: &str = "Đã kết thúc trò chuyện với nhân viên. Cảm ơn bạn! Nhắn \"Đặt hàng\" nếu bạn muốn đặt hàng.";

const CURRENT_CUSTOMER_LABEL: &str = "Khách hàng hiện tại";

/// Reply sent for inbound events that are not text messages.
pub fn unsupported_event() -> String {
    format!("{UNSUPPORTED_EVENT}\n\n{CONTACT_SUPPORT}")
}

pub fn customer_found(name: &str) -> String {
    format!("{GREETING}\nChào {name}!\n\n{PRODUCT_FORMAT_HINT}")
}

pub fn staff_unavailable() -> String {
    format!(
        "Hiện tại ngoài giờ làm việc (8:00 - 18:00, Thứ Hai - Thứ Bảy). Vui lòng quay lại sau hoặc liên hệ:\n{CONTACT_SUPPORT}"
    )
}

pub fn no_products_recognized() -> String {
    format!("{NO_PRODUCTS_RECOGNIZED}\n{PRODUCT_FORMAT_HINT}")
}

/// Amount in whole đồng with `.` thousands separators: `1.250.000 VNĐ`.
pub fn format_vnd(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let digits = rounded.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-{grouped} VNĐ")
    } else {
        format!("{grouped} VNĐ")
    }
}

fn format_dimension(value: Decimal) -> String {
    value.normalize().to_string()
}

fn describe_pane(code: &str, kind: &str, w: Decimal, h: Decimal, t: Decimal, quantity: u32) -> String {
    format!(
        "{code} - {kind} - {}*{}*{} mm - SL: {quantity}",
        format_dimension(w),
        format_dimension(h),
        format_dimension(t)
    )
}

/// Summary shown before the customer confirms.
pub fn order_summary(items: &[ParsedItem], phone: Option<&str>, customer_known: bool) -> String {
    let mut out = String::from("📋 CHI TIẾT ĐƠN HÀNG:\n");
    for (i, item) in items.iter().enumerate() {
        out.push_str(&format!(
            "{}. {}\n",
            i + 1,
            describe_pane(
                &item.item_code,
                &item.item_type,
                item.width,
                item.height,
                item.thickness,
                item.quantity
            )
        ));
    }
    if let Some(phone) = phone {
        out.push_str(&format!("\n📞 Số điện thoại: {phone}\n"));
    }
    if customer_known {
        out.push_str(&format!("👤 Khách hàng: {CURRENT_CUSTOMER_LABEL}\n"));
    }
    out.push('\n');
    out.push_str(CONFIRM_PROMPT);
    out
}

/// Confirmation sent once the order has been stored.
pub fn order_confirmed(order: &ZaloOrder) -> String {
    let mut out = format!(
        "✅ Đặt hàng thành công!\nMã đơn hàng: {}\n\n📋 CHI TIẾT ĐƠN HÀNG:\n",
        order.order_code()
    );
    for (i, d) in order.details().iter().enumerate() {
        out.push_str(&format!(
            "{}. {}\n",
            i + 1,
            describe_pane(&d.product_code, &d.product_type, d.width, d.height, d.thickness, d.quantity)
        ));
        match (d.unit_price, d.total_price()) {
            (Some(unit), Some(total)) => out.push_str(&format!(
                "   Đơn giá: {} - Thành tiền: {}\n",
                format_vnd(unit),
                format_vnd(total)
            )),
            _ => out.push_str("   Chưa có giá, nhân viên sẽ báo giá sau\n"),
        }
    }
    out.push_str(&format!("\n💰 TỔNG TIỀN: {}\n", format_vnd(order.total_amount())));
    if order.has_unpriced_lines() {
        out.push_str("(chưa bao gồm các sản phẩm chưa có giá)\n");
    }
    out.push_str("Nhân viên VNG Glass sẽ liên hệ với bạn để xác nhận đơn hàng.");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn vnd_amounts_use_dot_grouping_and_round_half_up() {
        assert_eq!(format_vnd(dec!(0)), "0 VNĐ");
        assert_eq!(format_vnd(dec!(999)), "999 VNĐ");
        assert_eq!(format_vnd(dec!(1000)), "1.000 VNĐ");
        assert_eq!(format_vnd(dec!(1250000)), "1.250.000 VNĐ");
        assert_eq!(format_vnd(dec!(129370.5)), "129.371 VNĐ");
        assert_eq!(format_vnd(dec!(-45000)), "-45.000 VNĐ");
    }

    #[test]
    fn unsupported_event_reply_appends_support_contacts() {
        let reply = unsupported_event();
        assert!(reply.starts_with(UNSUPPORTED_EVENT));
        assert!(reply.ends_with(CONTACT_SUPPORT));
        assert!(reply.contains("\n\n📞"));
    }

    #[test]
    fn summary_lists_items_phone_and_known_customer() {
        let items = vec![ParsedItem {
            item_code: "EI90".into(),
            item_type: "MB".into(),
            width: dec!(1000.0),
            height: dec!(2000),
            thickness: dec!(25),
            quantity: 2,
        }];
        let summary = order_summary(&items, Some("0912345678"), true);
        assert!(summary.starts_with("📋 CHI TIẾT ĐƠN HÀNG:"));
        assert!(summary.contains("1. EI90 - MB - 1000*2000*25 mm - SL: 2"));
        assert!(summary.contains("0912345678"));
        assert!(summary.contains("Khách hàng hiện tại"));

        let anonymous = order_summary(&items, None, false);
        assert!(!anonymous.contains("👤"));
    }
}
