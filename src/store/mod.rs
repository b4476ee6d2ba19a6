mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::*;

/// Counts surfaced on the overview screen.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Counts {
    pub contacts: i64,
    pub companies: i64,
    pub leads: i64,
    pub ideas: i64,
    pub projects: i64,
    pub assets: i64,
    pub tasks_open: i64,
}

/// Filters for the asset listing. `kind` is a coarse mime bucket:
/// "image", "video", "document", or "other".
#[derive(Debug, Clone, Default)]
pub struct AssetFilter {
    pub q: Option<String>,
    pub project_id: Option<i64>,
    pub contact_id: Option<i64>,
    pub kind: Option<String>,
}

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Company operations
    fn create_company(&self, company: &Company) -> Result<i64>;
    fn get_company(&self, id: i64) -> Result<Option<Company>>;
    fn find_company_by_name(&self, name: &str) -> Result<Option<Company>>;
    fn list_companies(&self, q: Option<&str>) -> Result<Vec<Company>>;
    fn update_company(&self, company: &Company) -> Result<()>;
    fn delete_company(&self, id: i64) -> Result<bool>;

    // Contact operations
    fn create_contact(&self, contact: &Contact) -> Result<i64>;
    fn get_contact(&self, id: i64) -> Result<Option<Contact>>;
    fn find_contact_by_email(&self, email: &str) -> Result<Option<Contact>>;
    fn list_contacts(&self, q: Option<&str>) -> Result<Vec<Contact>>;
    fn update_contact(&self, contact: &Contact) -> Result<()>;
    fn delete_contact(&self, id: i64) -> Result<bool>;
    fn list_contact_leads(&self, contact_id: i64) -> Result<Vec<Lead>>;
    fn list_contact_projects(&self, contact_id: i64) -> Result<Vec<Project>>;
    fn list_contact_assets(&self, contact_id: i64) -> Result<Vec<Asset>>;

    // Lead operations
    fn create_lead(&self, lead: &Lead) -> Result<i64>;
    fn get_lead(&self, id: i64) -> Result<Option<Lead>>;
    fn list_leads(&self, status: Option<LeadStatus>) -> Result<Vec<Lead>>;
    fn update_lead(&self, lead: &Lead) -> Result<()>;
    fn delete_lead(&self, id: i64) -> Result<bool>;

    // Idea operations
    fn create_idea(&self, idea: &Idea) -> Result<i64>;
    fn get_idea(&self, id: i64) -> Result<Option<Idea>>;
    fn list_ideas(&self) -> Result<Vec<Idea>>;
    fn update_idea(&self, idea: &Idea) -> Result<()>;
    fn delete_idea(&self, id: i64) -> Result<bool>;

    // Project operations
    fn create_project(&self, project: &Project) -> Result<i64>;
    fn get_project(&self, id: i64) -> Result<Option<Project>>;
    fn list_projects(&self) -> Result<Vec<Project>>;
    fn update_project(&self, project: &Project) -> Result<()>;
    fn delete_project(&self, id: i64) -> Result<bool>;
    fn list_project_tasks(&self, project_id: i64) -> Result<Vec<Task>>;
    fn list_project_assets(&self, project_id: i64) -> Result<Vec<Asset>>;
    fn list_project_events(&self, project_id: i64) -> Result<Vec<Event>>;

    // Task operations
    fn create_task(&self, task: &Task) -> Result<i64>;
    fn get_task(&self, id: i64) -> Result<Option<Task>>;
    fn update_task(&self, task: &Task) -> Result<()>;
    fn delete_task(&self, id: i64) -> Result<bool>;
    /// Open tasks with a due date inside the range, for the calendar view.
    fn list_open_tasks_due_between(
        &self,
        from: Option<&DateTime<Utc>>,
        to: Option<&DateTime<Utc>>,
    ) -> Result<Vec<Task>>;

    // Event operations
    fn create_event(&self, event: &Event) -> Result<i64>;
    fn get_event(&self, id: i64) -> Result<Option<Event>>;
    fn list_events(&self) -> Result<Vec<Event>>;
    fn list_events_between(
        &self,
        from: Option<&DateTime<Utc>>,
        to: Option<&DateTime<Utc>>,
    ) -> Result<Vec<Event>>;
    fn update_event(&self, event: &Event) -> Result<()>;
    fn delete_event(&self, id: i64) -> Result<bool>;

    // Asset operations
    fn create_asset(&self, asset: &Asset) -> Result<i64>;
    fn get_asset(&self, id: i64) -> Result<Option<Asset>>;
    fn find_duplicate_asset(
        &self,
        filename: &str,
        size_bytes: i64,
        mime_type: Option<&str>,
    ) -> Result<Option<Asset>>;
    fn list_assets(&self, filter: &AssetFilter, limit: i64) -> Result<Vec<Asset>>;
    fn update_asset(&self, asset: &Asset) -> Result<()>;
    fn delete_asset(&self, id: i64) -> Result<bool>;

    // Activity operations (append-only)
    fn record_activity(&self, entry: &NewActivity) -> Result<i64>;
    fn list_activity(&self, limit: i64, before: Option<&DateTime<Utc>>) -> Result<Vec<Activity>>;
    fn list_entity_activity(
        &self,
        entity_type: &str,
        entity_id: i64,
        limit: i64,
    ) -> Result<Vec<Activity>>;

    // Overview counts
    fn counts(&self) -> Result<Counts>;
}
