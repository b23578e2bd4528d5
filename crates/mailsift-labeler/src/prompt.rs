//! Prompt construction
//!
//! The system prompt embeds the full taxonomy (name + description) plus
//! fixed disambiguation rules and the required JSON output shape. The user
//! message lists each batch member's feature-bearing summary.

use mailsift_core::feature::BODY_PREFIX_CHARS;
use mailsift_core::{Message, Taxonomy};
use std::fmt::Write;

const DISAMBIGUATION_RULES: &str = "\
DISAMBIGUATION RULES (use these when a classification is ambiguous):
- LinkedIn \"new job match\" or recruiter InMail -> job_opportunity (NOT social_notification)
- LinkedIn \"X viewed your profile\" or likes/comments -> social_notification
- \"Thank you for applying\" / application received -> job_application_confirm (NOT job_interview)
- Interview scheduling, offers, rejections -> job_interview
- Bank fraud alert -> finance_alert (NOT security_auth)
- \"Your password was changed\" or new sign-in alert -> security_auth
- Amazon/store order confirmation -> shopping_orders (NOT finance_receipt)
- Stripe/PayPal payment receipt -> finance_receipt
- Coursera \"assignment due\" -> education; Coursera \"50% off\" -> marketing_promo
- Company blog newsletter user subscribed to -> newsletter_content
- Company \"sale\" or \"discount\" email -> marketing_promo
- Eventbrite invitation -> events_calendar (NOT marketing_promo)";

/// Build the classification system prompt from the taxonomy
pub fn build_system_prompt(taxonomy: &Taxonomy) -> String {
    let mut categories = String::new();
    for entry in taxonomy.iter() {
        let _ = writeln!(categories, "- {}: {}", entry.name, entry.description);
    }

    format!(
        "You are an email classifier for a personal inbox.\n\
         Classify each email into exactly one category.\n\n\
         Categories:\n{categories}\n\
         {DISAMBIGUATION_RULES}\n\n\
         Respond with ONLY a JSON array. Each element must have these fields:\n\
         {{\"id\": <email_id>, \"label\": \"<category>\", \"confidence\": <float 0.0 to 1.0>}}\n\n\
         Example response:\n\
         [{{\"id\": 1, \"label\": \"marketing_promo\", \"confidence\": 0.95}}, \
         {{\"id\": 2, \"label\": \"personal\", \"confidence\": 0.8}}]\n\n\
         Return ONLY the JSON array, no other text."
    )
}

/// Build the user message listing each batch member
pub fn build_user_message(batch: &[Message]) -> String {
    let descriptions: Vec<String> = batch
        .iter()
        .map(|message| {
            let body_preview: String = message.body.chars().take(BODY_PREFIX_CHARS).collect();
            format!(
                "Email ID: {}\nFrom: {}\nSubject: {}\nBody preview: {}",
                message.id, message.from_addr, message.subject, body_preview
            )
        })
        .collect();

    format!("Classify these emails:\n\n{}", descriptions.join("\n\n---\n\n"))
}
