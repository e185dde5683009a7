use std::convert::Infallible;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{EMAIL_PATTERN, simulate_latency};
use crate::config::PortalConfig;
use crate::form::{FieldRule, FormController, FormModel, FormRules};

#[derive(Clone, Debug, Default, PartialEq, FormModel)]
pub struct FeedbackForm {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub rating: u8,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub rating: u8,
    pub received_at: DateTime<Utc>,
}

/// In-memory stand-in for the feedback endpoint.
#[derive(Clone, Default)]
pub struct FeedbackInbox {
    entries: Arc<RwLock<Vec<FeedbackEntry>>>,
}

impl FeedbackInbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<FeedbackEntry> {
        match self.entries.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn push(&self, entry: FeedbackEntry) {
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.push(entry);
    }
}

pub fn feedback_rules() -> FormRules<FeedbackForm> {
    let fields = FeedbackForm::fields();
    FormRules::new()
        .field(fields.name(), FieldRule::new().required())
        .field(
            fields.email(),
            FieldRule::new().required().pattern(EMAIL_PATTERN.clone()),
        )
        .field(fields.subject(), FieldRule::new().max_length(120))
        .field(
            fields.message(),
            FieldRule::new().required().min_length(10).max_length(1000),
        )
        .field(
            fields.rating(),
            FieldRule::new().required().custom(|rating: &u8| {
                (*rating > 5).then(|| "Rating must be between 1 and 5".to_string())
            }),
        )
}

pub fn feedback_form(
    inbox: FeedbackInbox,
    config: &PortalConfig,
) -> FormController<FeedbackForm> {
    let latency = config.simulated_latency_ms;
    FormController::new(FeedbackForm::default(), feedback_rules()).with_async_submit_handler(
        move |values: FeedbackForm| {
            let inbox = inbox.clone();
            async move {
                simulate_latency(latency).await;
                inbox.push(FeedbackEntry {
                    name: values.name.trim().to_string(),
                    email: values.email,
                    subject: values.subject.trim().to_string(),
                    message: values.message,
                    rating: values.rating,
                    received_at: Utc::now(),
                });
                tracing::info!(rating = values.rating, "feedback received");
                Ok::<(), Infallible>(())
            }
        },
    )
}
