use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;

use super::controller::FieldKey;

pub trait FieldLens<T>: Copy + Send + Sync + 'static {
    type Value: Clone + PartialEq + Send + Sync + 'static;

    fn key(self) -> FieldKey;
    fn get<'a>(self, model: &'a T) -> &'a Self::Value;
    fn set(self, model: &mut T, value: Self::Value);
}

pub trait FormModel: Clone + Send + Sync + 'static {
    type Fields;

    fn fields() -> Self::Fields;

    /// The complete, fixed set of fields of this model.
    fn field_keys() -> &'static [FieldKey];
}

/// What the rule evaluator needs to know about a field value.
///
/// `is_blank` mirrors "falsy": empty or whitespace-only text, `false`, zero,
/// NaN and `None`. Only values that expose text through `as_text` take part in
/// the length and pattern rules.
pub trait FieldValue {
    fn is_blank(&self) -> bool;

    fn as_text(&self) -> Option<&str> {
        None
    }
}

impl FieldValue for String {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }

    fn as_text(&self) -> Option<&str> {
        Some(self.as_str())
    }
}

impl FieldValue for &'static str {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }

    fn as_text(&self) -> Option<&str> {
        Some(*self)
    }
}

impl FieldValue for Arc<str> {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }

    fn as_text(&self) -> Option<&str> {
        Some(&**self)
    }
}

impl FieldValue for bool {
    fn is_blank(&self) -> bool {
        !*self
    }
}

macro_rules! impl_integer_field_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                fn is_blank(&self) -> bool {
                    *self == 0
                }
            }
        )*
    };
}

impl_integer_field_value!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl FieldValue for f32 {
    fn is_blank(&self) -> bool {
        *self == 0.0 || self.is_nan()
    }
}

impl FieldValue for f64 {
    fn is_blank(&self) -> bool {
        *self == 0.0 || self.is_nan()
    }
}

impl FieldValue for Decimal {
    fn is_blank(&self) -> bool {
        self.is_zero()
    }
}

impl FieldValue for NaiveDate {
    fn is_blank(&self) -> bool {
        false
    }
}

impl<V> FieldValue for Option<V>
where
    V: FieldValue,
{
    fn is_blank(&self) -> bool {
        self.as_ref().is_none_or(|value| value.is_blank())
    }

    fn as_text(&self) -> Option<&str> {
        self.as_ref().and_then(|value| value.as_text())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum FieldError {
    #[error("This field is required")]
    Required,
    #[error("Minimum length is {min} characters")]
    TooShort { min: usize },
    #[error("Maximum length is {max} characters")]
    TooLong { max: usize },
    #[error("Invalid format")]
    InvalidFormat,
    #[error("{0}")]
    Custom(String),
    /// Injected by the caller, bypassing the rules.
    #[error("{0}")]
    Manual(String),
}

impl FieldError {
    pub fn message(&self) -> String {
        self.to_string()
    }
}

pub type CustomRuleFn<V> = Arc<dyn Fn(&V) -> Option<String> + Send + Sync>;

/// Declarative constraints for one field.
///
/// Rules are checked in a fixed order and the first failure wins: required,
/// minimum length, maximum length, pattern, then the custom rule. The custom
/// rule only runs when none of the built-in rules failed, and its answer is
/// final.
pub struct FieldRule<V> {
    required: bool,
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<Regex>,
    custom: Option<CustomRuleFn<V>>,
}

impl<V> Default for FieldRule<V> {
    fn default() -> Self {
        Self {
            required: false,
            min_length: None,
            max_length: None,
            pattern: None,
            custom: None,
        }
    }
}

impl<V> Clone for FieldRule<V> {
    fn clone(&self) -> Self {
        Self {
            required: self.required,
            min_length: self.min_length,
            max_length: self.max_length,
            pattern: self.pattern.clone(),
            custom: self.custom.clone(),
        }
    }
}

impl<V> Debug for FieldRule<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldRule")
            .field("required", &self.required)
            .field("min_length", &self.min_length)
            .field("max_length", &self.max_length)
            .field("pattern", &self.pattern.as_ref().map(Regex::as_str))
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

impl<V> FieldRule<V>
where
    V: FieldValue,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min_length(mut self, value: usize) -> Self {
        self.min_length = Some(value);
        self
    }

    pub fn max_length(mut self, value: usize) -> Self {
        self.max_length = Some(value);
        self
    }

    pub fn pattern(mut self, value: Regex) -> Self {
        self.pattern = Some(value);
        self
    }

    pub fn custom(mut self, rule: impl Fn(&V) -> Option<String> + Send + Sync + 'static) -> Self {
        self.custom = Some(Arc::new(rule));
        self
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn validate(&self, value: &V) -> Option<FieldError> {
        if self.required && value.is_blank() {
            return Some(FieldError::Required);
        }

        let text = value.as_text();
        if let (Some(min), Some(text)) = (self.min_length, text)
            && text.chars().count() < min
        {
            return Some(FieldError::TooShort { min });
        }
        if let (Some(max), Some(text)) = (self.max_length, text)
            && text.chars().count() > max
        {
            return Some(FieldError::TooLong { max });
        }
        if let (Some(pattern), Some(text)) = (&self.pattern, text)
            && !pattern.is_match(text)
        {
            return Some(FieldError::InvalidFormat);
        }

        self.custom
            .as_ref()
            .and_then(|custom| custom(value))
            .map(FieldError::Custom)
    }
}

pub(super) type FieldValidatorFn<T> = Arc<dyn Fn(&T) -> Option<FieldError> + Send + Sync>;

/// Rules for a form, keyed by field. Handed to the controller at construction
/// and fixed from then on.
pub struct FormRules<T> {
    pub(super) validators: BTreeMap<FieldKey, FieldValidatorFn<T>>,
    pub(super) required: Vec<FieldKey>,
}

impl<T> Default for FormRules<T> {
    fn default() -> Self {
        Self {
            validators: BTreeMap::new(),
            required: Vec::new(),
        }
    }
}

impl<T> FormRules<T>
where
    T: FormModel,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `rule` to the field behind `lens`, replacing any earlier rule
    /// for the same field.
    pub fn field<L>(mut self, lens: L, rule: FieldRule<L::Value>) -> Self
    where
        L: FieldLens<T>,
        L::Value: FieldValue,
    {
        let key = lens.key();
        self.required.retain(|required| *required != key);
        if rule.is_required() {
            self.required.push(key);
        }
        let validator: FieldValidatorFn<T> =
            Arc::new(move |model: &T| rule.validate(lens.get(model)));
        self.validators.insert(key, validator);
        self
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email_pattern() -> Regex {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex")
    }

    #[test]
    fn required_treats_blank_text_as_missing() {
        let rule = FieldRule::<String>::new().required();
        assert_eq!(rule.validate(&String::new()), Some(FieldError::Required));
        assert_eq!(rule.validate(&"   ".to_string()), Some(FieldError::Required));
        assert_eq!(rule.validate(&"x".to_string()), None);
    }

    #[test]
    fn required_follows_falsy_values_for_non_text() {
        assert_eq!(
            FieldRule::<bool>::new().required().validate(&false),
            Some(FieldError::Required)
        );
        assert_eq!(
            FieldRule::<u32>::new().required().validate(&0),
            Some(FieldError::Required)
        );
        assert_eq!(
            FieldRule::<f64>::new().required().validate(&f64::NAN),
            Some(FieldError::Required)
        );
        assert_eq!(
            FieldRule::<Option<String>>::new().required().validate(&None),
            Some(FieldError::Required)
        );
        assert_eq!(FieldRule::<u32>::new().required().validate(&7), None);
    }

    #[test]
    fn length_bounds_count_characters() {
        let rule = FieldRule::<String>::new().min_length(3).max_length(5);
        assert_eq!(
            rule.validate(&"ab".to_string()),
            Some(FieldError::TooShort { min: 3 })
        );
        assert_eq!(rule.validate(&"abc".to_string()), None);
        assert_eq!(rule.validate(&"അആഇഈ".to_string()), None);
        assert_eq!(
            rule.validate(&"abcdef".to_string()),
            Some(FieldError::TooLong { max: 5 })
        );
    }

    #[test]
    fn empty_optional_text_still_checks_length() {
        let rule = FieldRule::<String>::new().min_length(2);
        assert_eq!(
            rule.validate(&String::new()),
            Some(FieldError::TooShort { min: 2 })
        );
    }

    #[test]
    fn length_and_pattern_skip_non_text_values() {
        let rule = FieldRule::<u32>::new()
            .min_length(3)
            .pattern(Regex::new("^x$").expect("regex"));
        assert_eq!(rule.validate(&1), None);
    }

    #[test]
    fn pattern_mismatch_reports_invalid_format() {
        let rule = FieldRule::<String>::new().required().pattern(email_pattern());
        assert_eq!(
            rule.validate(&"not-an-email".to_string()),
            Some(FieldError::InvalidFormat)
        );
        assert_eq!(rule.validate(&"a@b.com".to_string()), None);
    }

    #[test]
    fn custom_rule_runs_only_after_builtin_rules_pass() {
        let rule = FieldRule::<String>::new()
            .required()
            .min_length(4)
            .custom(|_| Some("custom".to_string()));
        assert_eq!(rule.validate(&String::new()), Some(FieldError::Required));
        assert_eq!(
            rule.validate(&"abc".to_string()),
            Some(FieldError::TooShort { min: 4 })
        );
        assert_eq!(
            rule.validate(&"abcd".to_string()),
            Some(FieldError::Custom("custom".to_string()))
        );
    }

    #[test]
    fn custom_rule_can_clear_the_field() {
        let rule = FieldRule::<String>::new().custom(|_| None);
        assert_eq!(rule.validate(&"anything".to_string()), None);
    }

    #[test]
    fn messages_match_rule_texts() {
        assert_eq!(FieldError::Required.message(), "This field is required");
        assert_eq!(
            FieldError::TooShort { min: 6 }.message(),
            "Minimum length is 6 characters"
        );
        assert_eq!(
            FieldError::TooLong { max: 10 }.message(),
            "Maximum length is 10 characters"
        );
        assert_eq!(FieldError::InvalidFormat.message(), "Invalid format");
        assert_eq!(
            FieldError::Manual("Passwords do not match".into()).message(),
            "Passwords do not match"
        );
    }
}
