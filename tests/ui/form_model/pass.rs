use aarogyam::form::{FieldLens, FormModel};

#[derive(Clone, aarogyam::form::FormModel)]
struct ClinicVisitForm {
    patient_name: String,
    visit_count: u32,
}

fn main() {
    let fields = ClinicVisitForm::fields();
    let lens = fields.patient_name();
    let mut model = ClinicVisitForm {
        patient_name: "Anil".to_string(),
        visit_count: 0,
    };
    lens.set(&mut model, "Binu".to_string());
    fields.visit_count().set(&mut model, 3);

    assert_eq!(lens.key().as_str(), "patient_name");
    assert_eq!(lens.get(&model), "Binu");
    assert_eq!(*fields.visit_count().get(&model), 3);

    let keys: Vec<&str> = ClinicVisitForm::field_keys()
        .iter()
        .map(|key| key.as_str())
        .collect();
    assert_eq!(keys, ["patient_name", "visit_count"]);
}
