use std::convert::Infallible;

use super::{EMAIL_PATTERN, PHONE_PATTERN, simulate_latency};
use crate::config::PortalConfig;
use crate::form::{FieldLens, FieldRule, FormController, FormModel, FormRules};
use crate::portal::login::{LoginForm, fabricate_user};
use crate::session::{Role, SessionAction, SessionStore};

pub const PASSWORD_MISMATCH: &str = "Passwords do not match";

#[derive(Clone, Debug, Default, PartialEq, FormModel)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Role,
}

pub fn signup_rules() -> FormRules<SignupForm> {
    let fields = SignupForm::fields();
    FormRules::new()
        .field(
            fields.name(),
            FieldRule::new().required().min_length(2).max_length(60),
        )
        .field(
            fields.email(),
            FieldRule::new().required().pattern(EMAIL_PATTERN.clone()),
        )
        .field(
            fields.phone(),
            FieldRule::new().required().pattern(PHONE_PATTERN.clone()),
        )
        .field(fields.password(), FieldRule::new().required().min_length(6))
        .field(fields.confirm_password(), FieldRule::new().required())
}

pub fn signup_form(store: SessionStore, config: &PortalConfig) -> FormController<SignupForm> {
    let latency = config.simulated_latency_ms;
    FormController::new(SignupForm::default(), signup_rules()).with_async_submit_handler(
        move |values: SignupForm| {
            let store = store.clone();
            async move {
                simulate_latency(latency).await;
                let mut user = fabricate_user(&LoginForm {
                    email: values.email,
                    password: values.password,
                    role: values.role,
                });
                user.name = values.name.trim().to_string();
                tracing::info!(user = %user.id, "registered");
                store.dispatch(SessionAction::Login(user));
                Ok::<(), Infallible>(())
            }
        },
    )
}

/// Submits the signup form. A differing password confirmation blocks the
/// submit and is reported on `confirm_password`, unless that field already
/// fails its own rule.
pub async fn submit_signup(form: &FormController<SignupForm>) {
    let confirm_password = SignupForm::fields().confirm_password().key();
    form.handle_submit_with_checks(|values: &SignupForm| {
        (values.password != values.confirm_password)
            .then(|| (confirm_password, PASSWORD_MISMATCH.to_string()))
    })
    .await;
}
