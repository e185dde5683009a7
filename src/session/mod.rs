use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Malayalam,
    Hindi,
    Bengali,
    Odia,
    Tamil,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::English,
        Language::Malayalam,
        Language::Hindi,
        Language::Bengali,
        Language::Odia,
        Language::Tamil,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Malayalam => "ml",
            Self::Hindi => "hi",
            Self::Bengali => "bn",
            Self::Odia => "or",
            Self::Tamil => "ta",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("unsupported language `{0}`")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let tag = value.trim();
        let primary = tag.split(['-', '_']).next().unwrap_or(tag);
        Self::ALL
            .into_iter()
            .find(|language| language.code().eq_ignore_ascii_case(primary))
            .ok_or_else(|| UnknownLanguage(tag.to_string()))
    }
}

impl Display for Language {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Migrant,
    Hospital,
    Admin,
}

impl Role {
    pub const fn id_prefix(self) -> &'static str {
        match self {
            Self::Migrant => "MW",
            Self::Hospital => "HSP",
            Self::Admin => "ADM",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PortalUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SessionState {
    pub theme: Theme,
    pub language: Language,
    pub user: Option<PortalUser>,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SessionAction {
    SetTheme(Theme),
    ToggleTheme,
    SetLanguage(Language),
    Login(PortalUser),
    Logout,
}

impl SessionAction {
    fn apply(self, state: &mut SessionState) {
        match self {
            Self::SetTheme(theme) => state.theme = theme,
            Self::ToggleTheme => state.theme = state.theme.toggled(),
            Self::SetLanguage(language) => state.language = language,
            Self::Login(user) => state.user = Some(user),
            Self::Logout => state.user = None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SubscriptionId(pub u64);

type Listener = Arc<dyn Fn(&SessionState) + Send + Sync>;

/// Process-wide UI state shared by every view: theme, language and the
/// signed-in user. State only changes through [`SessionStore::dispatch`].
///
/// Listeners run after the state lock is released, so they may read the store
/// or dispatch again.
#[derive(Clone, Default)]
pub struct SessionStore {
    next_id: Arc<AtomicU64>,
    state: Arc<RwLock<SessionState>>,
    listeners: Arc<RwLock<BTreeMap<SubscriptionId, Listener>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: SessionState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            ..Self::default()
        }
    }

    pub fn state(&self) -> SessionState {
        match self.state.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn select<R>(&self, selector: impl FnOnce(&SessionState) -> R) -> R {
        match self.state.read() {
            Ok(guard) => selector(&*guard),
            Err(poisoned) => selector(&*poisoned.into_inner()),
        }
    }

    pub fn dispatch(&self, action: SessionAction) {
        tracing::debug!(?action, "session action");
        let next = {
            let mut state = match self.state.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            action.apply(&mut state);
            state.clone()
        };

        let listeners = match self.listeners.read() {
            Ok(guard) => guard.values().cloned().collect::<Vec<_>>(),
            Err(poisoned) => poisoned.into_inner().values().cloned().collect(),
        };
        for listener in listeners {
            listener(&next);
        }
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(&SessionState) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let mut listeners = match self.listeners.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        listeners.insert(id, Arc::new(listener));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = match self.listeners.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        listeners.remove(&id).is_some()
    }
}
