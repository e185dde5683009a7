mod controller;
mod submit;
mod validation;


pub use aarogyam_form_derive::FormModel;
pub use controller::{
    FieldKey, FieldMeta, FormController, FormError, FormId, FormResult, FormSnapshot, SubmitState,
};
pub use submit::{BoxedSubmitFuture, SUBMIT_INTERRUPTED, SubmitEvent};
pub use validation::{
    CustomRuleFn, FieldError, FieldLens, FieldRule, FieldValue, FormModel, FormRules,
};
