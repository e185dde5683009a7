use std::sync::{Arc, RwLock};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{PHONE_PATTERN, simulate_latency};
use crate::config::PortalConfig;
use crate::form::{
    FieldKey, FieldLens, FieldRule, FormController, FormModel, FormRules, SubmitState,
};

/// Byte capacity of the largest QR symbol (version 40, byte mode, low error
/// correction).
pub const QR_BYTE_CAPACITY: usize = 2953;

const GENDERS: [&str; 3] = ["male", "female", "other"];

#[derive(Clone, Debug, Default, PartialEq, FormModel)]
pub struct HealthCardForm {
    pub name: String,
    pub age: String,
    pub gender: String,
    pub phone: String,
    pub location: String,
    pub emergency_contact: String,
}

#[derive(Debug, thiserror::Error)]
pub enum HealthCardError {
    #[error("age `{0}` is not a whole number of years")]
    InvalidAge(String),
    #[error("health card payload is {0} bytes, more than a QR code holds")]
    PayloadTooLarge(usize),
    #[error("failed to encode health card payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Content of the QR code printed on the card. Encoding is one-way: nothing in
/// the portal reads it back.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCardPayload {
    pub migrant_id: String,
    pub name: String,
    pub age: u8,
    pub gender: String,
    pub phone: String,
    pub location: String,
    pub emergency_contact: String,
    pub issued_at: DateTime<Utc>,
}

impl HealthCardPayload {
    pub fn issue(
        values: &HealthCardForm,
        issued_at: DateTime<Utc>,
    ) -> Result<Self, HealthCardError> {
        let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
        Self::with_id(format!("KL-MW-{suffix}"), values, issued_at)
    }

    pub fn with_id(
        migrant_id: impl Into<String>,
        values: &HealthCardForm,
        issued_at: DateTime<Utc>,
    ) -> Result<Self, HealthCardError> {
        let age = values
            .age
            .trim()
            .parse::<u8>()
            .map_err(|_| HealthCardError::InvalidAge(values.age.clone()))?;
        Ok(Self {
            migrant_id: migrant_id.into(),
            name: values.name.trim().to_string(),
            age,
            gender: values.gender.trim().to_lowercase(),
            phone: values.phone.trim().to_string(),
            location: values.location.trim().to_string(),
            emergency_contact: values.emergency_contact.trim().to_string(),
            issued_at,
        })
    }

    pub fn to_qr_json(&self) -> Result<String, HealthCardError> {
        let json = serde_json::to_string(self)?;
        if json.len() > QR_BYTE_CAPACITY {
            return Err(HealthCardError::PayloadTooLarge(json.len()));
        }
        Ok(json)
    }

    pub fn issued_at_label(&self) -> String {
        self.issued_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

pub fn health_card_rules() -> FormRules<HealthCardForm> {
    let fields = HealthCardForm::fields();
    FormRules::new()
        .field(
            fields.name(),
            FieldRule::new().required().min_length(2).max_length(60),
        )
        .field(
            fields.age(),
            FieldRule::new()
                .required()
                .max_length(3)
                .custom(|age: &String| match age.trim().parse::<u8>() {
                    Ok(1..=120) => None,
                    _ => Some("Age must be between 1 and 120".to_string()),
                }),
        )
        .field(
            fields.gender(),
            FieldRule::new().required().custom(|gender: &String| {
                let gender = gender.trim().to_lowercase();
                (!GENDERS.contains(&gender.as_str())).then(|| "Select a gender".to_string())
            }),
        )
        .field(
            fields.phone(),
            FieldRule::new().required().pattern(PHONE_PATTERN.clone()),
        )
        .field(fields.location(), FieldRule::new().required().max_length(120))
        .field(
            fields.emergency_contact(),
            FieldRule::new().required().pattern(PHONE_PATTERN.clone()),
        )
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HealthCardStep {
    Personal,
    Contact,
    Review,
}

impl HealthCardStep {
    pub fn fields(self) -> Vec<FieldKey> {
        let fields = HealthCardForm::fields();
        match self {
            Self::Personal => vec![fields.name().key(), fields.age().key(), fields.gender().key()],
            Self::Contact => vec![
                fields.phone().key(),
                fields.location().key(),
                fields.emergency_contact().key(),
            ],
            Self::Review => Vec::new(),
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Personal => Self::Contact,
            Self::Contact | Self::Review => Self::Review,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            Self::Personal | Self::Contact => Self::Personal,
            Self::Review => Self::Contact,
        }
    }
}

/// The "generate health card" flow: two data-entry steps, a review step, and
/// the final submit that issues the card.
pub struct HealthCardWizard {
    form: FormController<HealthCardForm>,
    step: HealthCardStep,
    issued: Arc<RwLock<Option<HealthCardPayload>>>,
}

impl HealthCardWizard {
    pub fn new(config: &PortalConfig) -> Self {
        let latency = config.simulated_latency_ms;
        let issued = Arc::new(RwLock::new(None));
        let slot = issued.clone();
        let form = FormController::new(HealthCardForm::default(), health_card_rules())
            .with_async_submit_handler(move |values: HealthCardForm| {
                let slot = slot.clone();
                async move {
                    simulate_latency(latency).await;
                    let payload = HealthCardPayload::issue(&values, Utc::now())?;
                    payload.to_qr_json()?;
                    tracing::info!(migrant = %payload.migrant_id, "health card issued");
                    let mut slot = match slot.write() {
                        Ok(guard) => guard,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                    *slot = Some(payload);
                    Ok::<(), HealthCardError>(())
                }
            });
        Self {
            form,
            step: HealthCardStep::Personal,
            issued,
        }
    }

    pub fn form(&self) -> &FormController<HealthCardForm> {
        &self.form
    }

    pub fn step(&self) -> HealthCardStep {
        self.step
    }

    /// Moves forward when the current step's fields are valid.
    pub fn next_step(&mut self) -> bool {
        if !self.form.validate_fields(&self.step.fields()) {
            return false;
        }
        self.step = self.step.next();
        true
    }

    pub fn previous_step(&mut self) {
        self.step = self.step.previous();
    }

    /// Submits the whole form and returns the issued card. On validation
    /// errors the wizard jumps back to the first step that has one.
    pub async fn generate(&mut self) -> Option<HealthCardPayload> {
        self.form.handle_submit().await;
        match self.form.submit_state() {
            SubmitState::Succeeded => self.issued(),
            SubmitState::Invalid => {
                let errors = self.form.errors();
                let has_error = |step: HealthCardStep| {
                    step.fields()
                        .iter()
                        .any(|key| errors.get(key).is_some_and(Option::is_some))
                };
                if has_error(HealthCardStep::Personal) {
                    self.step = HealthCardStep::Personal;
                } else if has_error(HealthCardStep::Contact) {
                    self.step = HealthCardStep::Contact;
                }
                None
            }
            _ => None,
        }
    }

    pub fn issued(&self) -> Option<HealthCardPayload> {
        match self.issued.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Starts over with an empty form, keeping nothing from the last card.
    pub fn restart(&mut self) {
        self.form.reset();
        self.step = HealthCardStep::Personal;
        let mut issued = match self.issued.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *issued = None;
    }
}
