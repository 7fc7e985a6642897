//! Deterministic support-intent matcher used when no model credential is configured.
//!
//! Input is lower-cased and trimmed, then walked through [`RULES`] in order.
//! The first rule whose predicate holds supplies the reply; anything left over
//! lands on [`Intent::Fallback`], which echoes the caller's original text.

use std::fmt;

/// Support topic recognized by the mock responder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    PasswordReset,
    Refund,
    SupportHours,
    Escalation,
    EmailChange,
    OrderStatus,
    Pricing,
    Greeting,
    Fallback,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PasswordReset => "password_reset",
            Self::Refund => "refund",
            Self::SupportHours => "support_hours",
            Self::Escalation => "escalation",
            Self::EmailChange => "email_change",
            Self::OrderStatus => "order_status",
            Self::Pricing => "pricing",
            Self::Greeting => "greeting",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A predicate over normalized text paired with a canned reply.
#[derive(Clone, Copy)]
pub struct IntentRule {
    pub intent: Intent,
    pub matches: fn(&str) -> bool,
    pub reply: &'static str,
}

impl fmt::Debug for IntentRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntentRule")
            .field("intent", &self.intent)
            .field("reply", &self.reply)
            .finish_non_exhaustive()
    }
}

const PASSWORD_RESET_REPLY: &str = "No worries. To reset your password:\n\
I. Go to Settings → Security\n\
II. Click “Reset Password”\n\
III. Check your email for the reset link (valid for 15 minutes)\n\
If you don’t receive it, check spam or ask me to resend.";

const REFUND_REPLY: &str = "I can help with refunds. Please share your order number.\n\
Our standard window is 30 days from delivery. \
Once approved, refunds post within 3–5 business days.";

const SUPPORT_HOURS_REPLY: &str =
    "We’re available 24/7 via chat. Phone support is 9am–6pm ET, Monday–Friday.";

const ESCALATION_REPLY: &str = "I can escalate this. Please provide your email and best callback time. \
A specialist will reach out within one business day.";

const EMAIL_CHANGE_REPLY: &str = "To change your account email:\n\
I. Settings → Account\n\
II. Update Email\n\
III. Confirm via the verification link we send";

const ORDER_STATUS_REPLY: &str = "I can check that. Share your order number. \
If you have a tracking ID, you can also paste it here.";

const PRICING_REPLY: &str = "Our plans are:\n\
I. Starter: $9/month\n\
II. Pro: $29/month\n\
III. Team: $79/month\n\
Annual billing saves 15%.";

const GREETING_REPLY: &str = "Hi there! I can help with passwords, orders, billing, and account updates. \
What do you need today?";

const GREETINGS: [&str; 3] = ["hi", "hello", "hey"];

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| text.contains(needle))
}

fn is_password_reset(text: &str) -> bool {
    text.contains("reset") && text.contains("password")
}

fn is_refund(text: &str) -> bool {
    contains_any(text, &["refund", "money back"])
}

fn is_support_hours(text: &str) -> bool {
    contains_any(text, &["hours", "open", "opening"])
}

fn is_escalation(text: &str) -> bool {
    contains_any(text, &["agent", "human", "representative"])
}

fn is_email_change(text: &str) -> bool {
    text.contains("email") && contains_any(text, &["change", "update"])
}

fn is_order_status(text: &str) -> bool {
    contains_any(text, &["shipping", "track", "order status"])
}

fn is_pricing(text: &str) -> bool {
    contains_any(text, &["price", "pricing", "cost", "plan"])
}

// Bare greetings must match exactly; "help" matches anywhere.
fn is_greeting(text: &str) -> bool {
    GREETINGS.contains(&text) || text.contains("help")
}

/// Priority-ordered rule table. Earlier rules win over later ones.
pub static RULES: &[IntentRule] = &[
    IntentRule {
        intent: Intent::PasswordReset,
        matches: is_password_reset,
        reply: PASSWORD_RESET_REPLY,
    },
    IntentRule {
        intent: Intent::Refund,
        matches: is_refund,
        reply: REFUND_REPLY,
    },
    IntentRule {
        intent: Intent::SupportHours,
        matches: is_support_hours,
        reply: SUPPORT_HOURS_REPLY,
    },
    IntentRule {
        intent: Intent::Escalation,
        matches: is_escalation,
        reply: ESCALATION_REPLY,
    },
    IntentRule {
        intent: Intent::EmailChange,
        matches: is_email_change,
        reply: EMAIL_CHANGE_REPLY,
    },
    IntentRule {
        intent: Intent::OrderStatus,
        matches: is_order_status,
        reply: ORDER_STATUS_REPLY,
    },
    IntentRule {
        intent: Intent::Pricing,
        matches: is_pricing,
        reply: PRICING_REPLY,
    },
    IntentRule {
        intent: Intent::Greeting,
        matches: is_greeting,
        reply: GREETING_REPLY,
    },
];

/// The ordered rule table, excluding the fallback.
pub fn rules() -> &'static [IntentRule] {
    RULES
}

pub fn normalize(message: &str) -> String {
    message.to_lowercase().trim().to_string()
}

fn first_match(message: &str) -> Option<&'static IntentRule> {
    let text = normalize(message);
    RULES.iter().find(|rule| (rule.matches)(&text))
}

/// Which intent the mock responder would answer `message` with.
pub fn classify(message: &str) -> Intent {
    first_match(message).map_or(Intent::Fallback, |rule| rule.intent)
}

/// Canned reply for `message`. Pure: identical input yields identical output.
pub fn mock_reply(message: &str) -> String {
    match first_match(message) {
        Some(rule) => rule.reply.to_string(),
        None => fallback_reply(message),
    }
}

/// Echo reply built from the original, non-normalized text.
pub fn fallback_reply(message: &str) -> String {
    format!(
        "(Mock) I hear you: “{message}”. Tell me a bit more and I’ll point you to the right steps."
    )
}
