use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Role of an account inside one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProjectRole {
    Owner,
    Admin,
    Member,
}

impl ProjectRole {
    /// Owners and project admins may update the project and manage members.
    pub fn can_manage(self) -> bool {
        matches!(self, ProjectRole::Owner | ProjectRole::Admin)
    }
}
