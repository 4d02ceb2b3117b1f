pub mod accounts;
pub mod bug_comments;
pub mod bug_tickets;
pub mod integrations;
pub mod job_queue;
pub mod organizations;
pub mod project_members;
pub mod projects;
pub mod session_logs;
pub mod sessions;
pub mod test_configs;
pub mod test_reports;
pub mod test_results;
pub mod test_sessions;
pub mod usage_stats;

pub use accounts::{Account, NewAccount};
pub use organizations::{NewOrganization, Organization};
pub use sessions::Session;
