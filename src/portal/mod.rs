//! The portal's forms: rules, submit handlers against the mocked backend, and
//! the hand-off of submitted values to the session store or health card.

mod feedback;
mod health_card;
mod login;
mod signup;

use std::sync::LazyLock;
use std::time::Duration;

use futures_timer::Delay;
use regex::Regex;

pub use feedback::{FeedbackEntry, FeedbackForm, FeedbackInbox, feedback_form, feedback_rules};
pub use health_card::{
    HealthCardError, HealthCardForm, HealthCardPayload, HealthCardStep, HealthCardWizard,
    QR_BYTE_CAPACITY, health_card_rules,
};
pub use login::{LoginForm, fabricate_user, login_form, login_rules};
pub use signup::{PASSWORD_MISMATCH, SignupForm, signup_form, signup_rules, submit_signup};

pub(crate) static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

/// Ten-digit Indian mobile number.
pub(crate) static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[6-9]\d{9}$").expect("phone pattern is a valid regex"));

/// Stands in for a backend round trip.
pub(crate) async fn simulate_latency(millis: u64) {
    if millis > 0 {
        Delay::new(Duration::from_millis(millis)).await;
    }
}
