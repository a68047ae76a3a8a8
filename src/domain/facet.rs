use serde::{Deserialize, Serialize};

/// Machine name of the synthetic catch-all language.
pub const ALL_LANGUAGES_MACHINE_NAME: &str = "all";
const ALL_LANGUAGES_DISPLAY_NAME: &str = "All Languages";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Language {
    pub machine_name: String,
    pub display_name: String,
}

impl Language {
    pub fn new(machine_name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            machine_name: machine_name.into(),
            display_name: display_name.into(),
        }
    }

    /// The "all languages" facet dimension that always exists alongside
    /// discovered languages.
    pub fn all() -> Self {
        Self::new(ALL_LANGUAGES_MACHINE_NAME, ALL_LANGUAGES_DISPLAY_NAME)
    }

    pub fn is_catch_all(&self) -> bool {
        self.machine_name == ALL_LANGUAGES_MACHINE_NAME
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    /// Value of the `since` query parameter, e.g. `daily`.
    pub machine_name: String,
    pub display_name: String,
    /// Query string including the leading `?`, e.g. `?since=daily`.
    pub url_suffix: String,
    /// Listing URL for this period across all languages. Not persisted.
    #[serde(default)]
    pub all_url: String,
}

impl Period {
    pub fn new(
        machine_name: impl Into<String>,
        display_name: impl Into<String>,
        url_suffix: impl Into<String>,
        all_url: impl Into<String>,
    ) -> Self {
        Self {
            machine_name: machine_name.into(),
            display_name: display_name.into(),
            url_suffix: url_suffix.into(),
            all_url: all_url.into(),
        }
    }
}
