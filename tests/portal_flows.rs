use std::sync::{Arc, Mutex};

use aarogyam::form::{FieldError, SubmitState};
use aarogyam::portal::{
    HealthCardForm, HealthCardStep, HealthCardWizard, LoginForm, login_form,
};
use aarogyam::session::{Role, SessionAction, SessionStore};
use aarogyam::{FormModel, PortalConfig};
use futures::executor::block_on;

fn instant_config() -> PortalConfig {
    PortalConfig {
        simulated_latency_ms: 0,
        ..PortalConfig::default()
    }
}

#[test]
fn login_then_logout_round_trip_through_the_session_store() {
    let store = SessionStore::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let subscription = store.subscribe(move |state| {
        sink.lock()
            .expect("listener lock")
            .push(state.is_authenticated());
    });

    let form = login_form(store.clone(), &instant_config());
    let fields = LoginForm::fields();
    form.set_field_value(fields.email(), "not-an-email".into());
    form.set_field_touched(fields.email(), true);
    assert_eq!(form.error(fields.email()), Some(FieldError::InvalidFormat));
    assert_eq!(
        form.visible_error(fields.email()),
        Some("Invalid format".to_string())
    );

    form.set_field_value(fields.email(), "meera@example.com".into());
    form.set_field_value(fields.password(), "kerala1".into());
    form.set_field_value(fields.role(), Role::Admin);
    block_on(form.handle_submit());

    assert_eq!(form.submit_state(), SubmitState::Succeeded);
    let user = store.state().user.expect("signed in");
    assert!(user.id.starts_with("ADM-"));
    assert_eq!(user.name, "Meera");

    store.dispatch(SessionAction::Logout);
    assert!(!store.state().is_authenticated());
    assert!(store.unsubscribe(subscription));

    assert_eq!(*seen.lock().expect("listener lock"), vec![true, false]);
}

#[test]
fn health_card_wizard_issues_a_card_end_to_end() {
    let mut wizard = HealthCardWizard::new(&instant_config());
    let fields = HealthCardForm::fields();
    let form = wizard.form().clone();

    form.set_field_value(fields.name(), "Rafiq Ali".into());
    form.set_field_value(fields.age(), "27".into());
    form.set_field_value(fields.gender(), "other".into());
    assert!(wizard.next_step());
    assert_eq!(wizard.step(), HealthCardStep::Contact);

    form.set_field_value(fields.phone(), "7012345678".into());
    form.set_field_value(fields.location(), "Kochi".into());
    form.set_field_value(fields.emergency_contact(), "8012345678".into());
    assert!(wizard.next_step());

    let card = block_on(wizard.generate()).expect("card issued");
    let json = card.to_qr_json().expect("fits a QR code");
    assert!(json.contains("\"migrantId\":\"KL-MW-"));
    assert!(json.contains("\"emergencyContact\":\"8012345678\""));
    assert_eq!(form.submit_count(), 1);
}
