//! Form validation engine and the forms of the Aarogyam migrant health portal.
//!
//! [`form`] holds the UI-agnostic engine: per-field rules, touched/error
//! tracking and guarded submission. [`portal`] builds the portal's login,
//! signup, feedback and health card forms on top of it, and [`session`] is the
//! application-wide store those forms hand their results to.

pub mod config;
pub mod form;
pub mod logging;
pub mod portal;
pub mod session;

pub use config::PortalConfig;
pub use form::{FieldError, FieldRule, FormController, FormModel, FormRules, SubmitState};
pub use session::{SessionAction, SessionState, SessionStore};
