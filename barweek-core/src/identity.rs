use serde::{Deserialize, Serialize};

use crate::backend::UserAccount;

/// Who is acting: an anonymous guest or a signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Identity {
    #[default]
    Guest,
    User(UserAccount),
}

impl Identity {
    pub fn account(&self) -> Option<&UserAccount> {
        match self {
            Identity::Guest => None,
            Identity::User(account) => Some(account),
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Identity::Guest)
    }
}
