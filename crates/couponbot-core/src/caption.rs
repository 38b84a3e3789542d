//! Caption rendering for a coupon post.
//!
//! The layout is fixed: one decorated line per field, separated by blank
//! lines, followed by the promotional footer. Field content is inserted
//! verbatim and never inspected.

use crate::config::CaptionConfig;
use crate::types::Coupon;

pub const DEFAULT_FOOTER_TEXT: &str = "💎 لمزيد من الكوبونات والخصومات:";
pub const DEFAULT_FOOTER_LINK: &str = "https://www.discountcoupon.online";

/// Footer appended under every caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionTemplate {
    pub footer_text: String,
    pub footer_link: String,
}

impl Default for CaptionTemplate {
    fn default() -> Self {
        Self {
            footer_text: DEFAULT_FOOTER_TEXT.to_string(),
            footer_link: DEFAULT_FOOTER_LINK.to_string(),
        }
    }
}

impl From<&CaptionConfig> for CaptionTemplate {
    fn from(cfg: &CaptionConfig) -> Self {
        Self {
            footer_text: cfg.footer_text.clone(),
            footer_link: cfg.footer_link.clone(),
        }
    }
}

impl CaptionTemplate {
    pub fn render(&self, coupon: &Coupon) -> String {
        format!(
            "🎉 {title}\n\n\
             🔥 {description}\n\n\
             ✅ الكوبون : {code}\n\n\
             🌍 صالح لـ : {countries}\n\n\
             📌 ملاحظة : {note}\n\n\
             🛒 رابط الشراء : {link}\n\n\
             🖼️ الصورة : {image}\n\n\
             {footer_text}\n\
             {footer_link}",
            title = coupon.title,
            description = coupon.description,
            code = coupon.code,
            countries = coupon.countries,
            note = coupon.note,
            link = coupon.link,
            image = coupon.image,
            footer_text = self.footer_text,
            footer_link = self.footer_link,
        )
    }
}

/// Render `coupon` with the default footer.
pub fn format_message(coupon: &Coupon) -> String {
    CaptionTemplate::default().render(coupon)
}
