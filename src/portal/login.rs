use std::convert::Infallible;

use uuid::Uuid;

use super::{EMAIL_PATTERN, simulate_latency};
use crate::config::PortalConfig;
use crate::form::{FieldRule, FormController, FormModel, FormRules};
use crate::session::{PortalUser, Role, SessionAction, SessionStore};

#[derive(Clone, Debug, Default, PartialEq, FormModel)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub role: Role,
}

pub fn login_rules() -> FormRules<LoginForm> {
    let fields = LoginForm::fields();
    FormRules::new()
        .field(
            fields.email(),
            FieldRule::new().required().pattern(EMAIL_PATTERN.clone()),
        )
        .field(fields.password(), FieldRule::new().required().min_length(6))
}

/// Login form wired to the mocked backend: any well-formed input signs in.
pub fn login_form(store: SessionStore, config: &PortalConfig) -> FormController<LoginForm> {
    let latency = config.simulated_latency_ms;
    FormController::new(LoginForm::default(), login_rules()).with_async_submit_handler(
        move |values: LoginForm| {
            let store = store.clone();
            async move {
                simulate_latency(latency).await;
                let user = fabricate_user(&values);
                tracing::info!(user = %user.id, role = ?user.role, "signed in");
                store.dispatch(SessionAction::Login(user));
                Ok::<(), Infallible>(())
            }
        },
    )
}

/// Builds the user record the portal shows after login. No credential check
/// takes place.
pub fn fabricate_user(values: &LoginForm) -> PortalUser {
    let email = values.email.trim();
    let local = email.split('@').next().unwrap_or(email);
    let mut name = String::with_capacity(local.len());
    let mut chars = local.chars();
    if let Some(first) = chars.next() {
        name.extend(first.to_uppercase());
        name.push_str(chars.as_str());
    }

    let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    PortalUser {
        id: format!("{}-{suffix}", values.role.id_prefix()),
        name,
        email: email.to_string(),
        role: values.role,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    fn instant_config() -> PortalConfig {
        PortalConfig {
            simulated_latency_ms: 0,
            ..PortalConfig::default()
        }
    }

    #[test]
    fn fabricated_user_carries_role_prefix_and_name() {
        let user = fabricate_user(&LoginForm {
            email: " ravi.kumar@example.com ".into(),
            password: "secret1".into(),
            role: Role::Hospital,
        });
        assert_eq!(user.name, "Ravi.kumar");
        assert_eq!(user.email, "ravi.kumar@example.com");
        assert_eq!(user.role, Role::Hospital);
        assert!(user.id.starts_with("HSP-"));
        assert_eq!(user.id.len(), "HSP-".len() + 8);
    }

    #[test]
    fn valid_login_signs_the_user_in() {
        let store = SessionStore::new();
        let form = login_form(store.clone(), &instant_config());
        let fields = LoginForm::fields();

        form.set_field_value(fields.email(), "asha@example.com".into());
        form.set_field_value(fields.password(), "123456".into());
        form.set_field_value(fields.role(), Role::Migrant);
        block_on(form.handle_submit());

        let user = store.state().user.expect("user signed in");
        assert_eq!(user.name, "Asha");
        assert!(user.id.starts_with("MW-"));
        assert!(!form.is_submitting());
    }

    #[test]
    fn invalid_login_leaves_the_session_alone() {
        let store = SessionStore::new();
        let form = login_form(store.clone(), &instant_config());

        block_on(form.handle_submit());

        assert!(!store.state().is_authenticated());
        assert_eq!(
            form.visible_error(LoginForm::fields().password()),
            Some("This field is required".to_string())
        );
    }
}
