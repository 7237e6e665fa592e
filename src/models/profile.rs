use serde::{Deserialize, Serialize};

/// Document key for the per-user profile.
pub(crate) const PROFILE_DOCUMENT_ID: &str = "Personal_Data";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Profile {
    pub mail: String,
    #[serde(default)]
    pub name: String,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub creation_date: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl Profile {
    pub(crate) fn new(mail: &str, now_millis: i64) -> Self {
        Self {
            mail: mail.to_string(),
            name: String::new(),
            creation_date: now_millis,
            updated_at: now_millis,
        }
    }

    pub(crate) fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.mail
        } else {
            &self.name
        }
    }
}
