use aarogyam::form::{FieldRule, FormController, FormModel, FormRules};

#[derive(Clone, Default, aarogyam::form::FormModel)]
struct DistrictForm {
    district: String,
    pincode: Option<String>,
}

fn main() {
    let fields = DistrictForm::fields();
    let rules = FormRules::new()
        .field(fields.district(), FieldRule::new().required().min_length(3))
        .field(fields.pincode(), FieldRule::new().max_length(6));
    let form = FormController::new(DistrictForm::default(), rules);

    assert!(!form.validate_form());
    form.set_field_value(fields.district(), "Idukki".to_string());
    form.set_field_value(fields.pincode(), Some("685501".to_string()));
    assert!(form.is_valid());
}
