//! PayUp notification templates.
//!
//! Amounts are integer minor units (cents) so splitting never accumulates
//! floating-point error; they are rendered with two decimals.

use serde::{Deserialize, Serialize};

use super::{Notification, NotificationKind};
use crate::transport::OutgoingEmail;

/// Format minor units as `"12.34 EUR"`.
pub fn format_amount(amount_minor: i64, currency: &str) -> String {
    let sign = if amount_minor < 0 { "-" } else { "" };
    let abs = amount_minor.unsigned_abs();
    format!("{}{}.{:02} {}", sign, abs / 100, abs % 100, currency)
}

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn wrap_html(group_name: &str, body: &str) -> String {
    format!(
        "<div style=\"font-family:sans-serif;max-width:560px\">\
         <h2>PayUp &middot; {}</h2>{}\
         <p style=\"color:#888;font-size:12px\">You receive this because you are a member of this group.</p>\
         </div>",
        escape_html(group_name),
        body
    )
}

// =============================================================================
// Expense Added
// =============================================================================

/// A member logged a shared expense; tells another member their share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseAdded {
    pub recipient_email: String,
    pub recipient_name: String,
    pub group_name: String,
    pub payer_name: String,
    pub description: String,
    /// Full expense amount
    pub total_minor: i64,
    /// Recipient's share of the expense
    pub share_minor: i64,
    pub currency: String,
}

impl ExpenseAdded {
    pub fn render(&self) -> Notification {
        let total = format_amount(self.total_minor, &self.currency);
        let share = format_amount(self.share_minor, &self.currency);

        let subject = format!("{}: new expense \"{}\"", self.group_name, self.description);

        let body = format!(
            "<p>Hi {},</p>\
             <p>{} paid <strong>{}</strong> for <em>{}</em>.</p>\
             <p>Your share is <strong>{}</strong>.</p>",
            escape_html(&self.recipient_name),
            escape_html(&self.payer_name),
            total,
            escape_html(&self.description),
            share,
        );

        let text = format!(
            "Hi {},\n\n{} paid {} for {} in {}.\nYour share is {}.\n",
            self.recipient_name, self.payer_name, total, self.description, self.group_name, share,
        );

        Notification {
            kind: NotificationKind::ExpenseAdded,
            email: OutgoingEmail {
                to: self.recipient_email.clone(),
                subject,
                html: wrap_html(&self.group_name, &body),
                text: Some(text),
            },
        }
    }
}

// =============================================================================
// Settlement Reminder
// =============================================================================

/// Tells a debtor how much they owe whom.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementReminder {
    pub debtor_email: String,
    pub debtor_name: String,
    pub creditor_name: String,
    pub group_name: String,
    pub amount_minor: i64,
    pub currency: String,
    /// Free-form message from whoever triggered the reminder
    #[serde(default)]
    pub note: Option<String>,
}

impl SettlementReminder {
    pub fn render(&self) -> Notification {
        let amount = format_amount(self.amount_minor, &self.currency);

        let subject = format!("{}: you owe {} {}", self.group_name, self.creditor_name, amount);

        let note_html = self
            .note
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .map(|n| format!("<blockquote>{}</blockquote>", escape_html(n)))
            .unwrap_or_default();

        let body = format!(
            "<p>Hi {},</p>\
             <p>You currently owe <strong>{}</strong> to {}.</p>{}\
             <p>Settle up in PayUp once you have paid.</p>",
            escape_html(&self.debtor_name),
            amount,
            escape_html(&self.creditor_name),
            note_html,
        );

        let mut text = format!(
            "Hi {},\n\nYou currently owe {} to {} in {}.\n",
            self.debtor_name, amount, self.creditor_name, self.group_name,
        );
        if let Some(note) = self.note.as_deref().filter(|n| !n.trim().is_empty()) {
            text.push_str(&format!("\n\"{}\"\n", note));
        }

        Notification {
            kind: NotificationKind::SettlementReminder,
            email: OutgoingEmail {
                to: self.debtor_email.clone(),
                subject,
                html: wrap_html(&self.group_name, &body),
                text: Some(text),
            },
        }
    }
}
