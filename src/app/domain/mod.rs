pub mod account_id;
pub mod account_role;
pub mod email;
pub mod organization_id;
pub mod password;
pub mod project_role;

pub use account_id::AccountId;
pub use account_role::AccountRole;
pub use email::Email;
pub use organization_id::OrganizationId;
pub use password::{HashedPassword, Password};
pub use project_role::ProjectRole;

/// Fresh ULID string for entities that don't warrant their own newtype
/// (test sessions, bug tickets, job rows, ...).
pub fn new_ulid() -> String {
    ulid::Ulid::new().to_string()
}
