use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::schema::SCHEMA;
use super::{AssetFilter, Counts, Store};
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_status<T>(s: &str) -> T
where
    T: std::str::FromStr<Err = String> + Default,
{
    s.parse().unwrap_or_else(|e| {
        tracing::error!("Invalid status in database: {}", e);
        T::default()
    })
}

/// Maps INSERT/UPDATE constraint failures (dead foreign keys, NOT NULL
/// violations) to a ValidationError instead of a generic database error.
fn constraint_to_validation(e: rusqlite::Error) -> Error {
    match e {
        rusqlite::Error::SqliteFailure(err, msg)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Error::Validation(msg.unwrap_or_else(|| "constraint violation".to_string()))
        }
        e => Error::from(e),
    }
}

fn company_from_row(row: &Row<'_>) -> rusqlite::Result<Company> {
    Ok(Company {
        id: row.get(0)?,
        name: row.get(1)?,
        website: row.get(2)?,
        notes: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        updated_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn contact_from_row(row: &Row<'_>) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        role: row.get(5)?,
        company_id: row.get(6)?,
        notes: row.get(7)?,
        created_at: parse_datetime(&row.get::<_, String>(8)?),
        updated_at: parse_datetime(&row.get::<_, String>(9)?),
    })
}

fn lead_from_row(row: &Row<'_>) -> rusqlite::Result<Lead> {
    Ok(Lead {
        id: row.get(0)?,
        title: row.get(1)?,
        status: parse_status(&row.get::<_, String>(2)?),
        source: row.get(3)?,
        value_estimate: row.get(4)?,
        company_id: row.get(5)?,
        contact_id: row.get(6)?,
        next_step: row.get(7)?,
        due_date: row.get::<_, Option<String>>(8)?.map(|s| parse_datetime(&s)),
        notes: row.get(9)?,
        created_at: parse_datetime(&row.get::<_, String>(10)?),
        updated_at: parse_datetime(&row.get::<_, String>(11)?),
    })
}

fn idea_from_row(row: &Row<'_>) -> rusqlite::Result<Idea> {
    Ok(Idea {
        id: row.get(0)?,
        title: row.get(1)?,
        status: parse_status(&row.get::<_, String>(2)?),
        tags: row.get(3)?,
        notes: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        status: parse_status(&row.get::<_, String>(2)?),
        company_id: row.get(3)?,
        contact_id: row.get(4)?,
        start_date: row.get::<_, Option<String>>(5)?.map(|s| parse_datetime(&s)),
        end_date: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
        budget: row.get(7)?,
        notes: row.get(8)?,
        created_at: parse_datetime(&row.get::<_, String>(9)?),
        updated_at: parse_datetime(&row.get::<_, String>(10)?),
    })
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        project_id: row.get(1)?,
        title: row.get(2)?,
        status: parse_status(&row.get::<_, String>(3)?),
        due_date: row.get::<_, Option<String>>(4)?.map(|s| parse_datetime(&s)),
        notes: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?),
        updated_at: parse_datetime(&row.get::<_, String>(7)?),
    })
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        id: row.get(0)?,
        title: row.get(1)?,
        start: parse_datetime(&row.get::<_, String>(2)?),
        end: row.get::<_, Option<String>>(3)?.map(|s| parse_datetime(&s)),
        all_day: row.get(4)?,
        project_id: row.get(5)?,
        contact_id: row.get(6)?,
        location: row.get(7)?,
        notes: row.get(8)?,
        created_at: parse_datetime(&row.get::<_, String>(9)?),
        updated_at: parse_datetime(&row.get::<_, String>(10)?),
    })
}

fn asset_from_row(row: &Row<'_>) -> rusqlite::Result<Asset> {
    Ok(Asset {
        id: row.get(0)?,
        filename: row.get(1)?,
        stored_name: row.get(2)?,
        mime_type: row.get(3)?,
        size_bytes: row.get(4)?,
        tags: row.get(5)?,
        project_id: row.get(6)?,
        contact_id: row.get(7)?,
        notes: row.get(8)?,
        created_at: parse_datetime(&row.get::<_, String>(9)?),
    })
}

fn activity_from_row(row: &Row<'_>) -> rusqlite::Result<Activity> {
    Ok(Activity {
        id: row.get(0)?,
        ts: parse_datetime(&row.get::<_, String>(1)?),
        action: row
            .get::<_, String>(2)?
            .parse()
            .unwrap_or(ActivityAction::Update),
        entity_type: row.get(3)?,
        entity_id: row.get(4)?,
        summary: row.get(5)?,
        changes: row
            .get::<_, Option<String>>(6)?
            .and_then(|s| serde_json::from_str(&s).ok()),
    })
}

const CONTACT_COLS: &str =
    "id, first_name, last_name, email, phone, role, company_id, notes, created_at, updated_at";
const LEAD_COLS: &str = "id, title, status, source, value_estimate, company_id, contact_id, \
     next_step, due_date, notes, created_at, updated_at";
const PROJECT_COLS: &str = "id, name, status, company_id, contact_id, start_date, end_date, \
     budget, notes, created_at, updated_at";
const TASK_COLS: &str = "id, project_id, title, status, due_date, notes, created_at, updated_at";
const EVENT_COLS: &str = "id, title, start, \"end\", all_day, project_id, contact_id, location, \
     notes, created_at, updated_at";
const ASSET_COLS: &str = "id, filename, stored_name, mime_type, size_bytes, tags, project_id, \
     contact_id, notes, created_at";

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Company operations

    fn create_company(&self, company: &Company) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO companies (name, website, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                company.name,
                company.website,
                company.notes,
                format_datetime(&company.created_at),
                format_datetime(&company.updated_at),
            ],
        )
        .map_err(constraint_to_validation)?;
        Ok(conn.last_insert_rowid())
    }

    fn get_company(&self, id: i64) -> Result<Option<Company>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, website, notes, created_at, updated_at
             FROM companies WHERE id = ?1",
            params![id],
            company_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn find_company_by_name(&self, name: &str) -> Result<Option<Company>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, website, notes, created_at, updated_at
             FROM companies WHERE lower(name) = lower(?1)",
            params![name],
            company_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_companies(&self, q: Option<&str>) -> Result<Vec<Company>> {
        let conn = self.conn();
        let like = q.map(|q| format!("%{q}%"));
        let mut stmt = conn.prepare(
            "SELECT id, name, website, notes, created_at, updated_at
             FROM companies
             WHERE ?1 IS NULL OR name LIKE ?1 OR website LIKE ?1 OR notes LIKE ?1
             ORDER BY name",
        )?;
        let rows = stmt.query_map(params![like], company_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_company(&self, company: &Company) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE companies SET name = ?1, website = ?2, notes = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![
                    company.name,
                    company.website,
                    company.notes,
                    format_datetime(&company.updated_at),
                    company.id,
                ],
            )
            .map_err(constraint_to_validation)?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_company(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM companies WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Contact operations

    fn create_contact(&self, contact: &Contact) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO contacts (first_name, last_name, email, phone, role, company_id, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                contact.first_name,
                contact.last_name,
                contact.email,
                contact.phone,
                contact.role,
                contact.company_id,
                contact.notes,
                format_datetime(&contact.created_at),
                format_datetime(&contact.updated_at),
            ],
        )
        .map_err(constraint_to_validation)?;
        Ok(conn.last_insert_rowid())
    }

    fn get_contact(&self, id: i64) -> Result<Option<Contact>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {CONTACT_COLS} FROM contacts WHERE id = ?1"),
            params![id],
            contact_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn find_contact_by_email(&self, email: &str) -> Result<Option<Contact>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {CONTACT_COLS} FROM contacts WHERE email = ?1"),
            params![email],
            contact_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_contacts(&self, q: Option<&str>) -> Result<Vec<Contact>> {
        let conn = self.conn();
        let like = q.map(|q| format!("%{q}%"));
        let mut stmt = conn.prepare(&format!(
            "SELECT {CONTACT_COLS} FROM contacts
             WHERE ?1 IS NULL OR first_name LIKE ?1 OR last_name LIKE ?1 OR email LIKE ?1
             ORDER BY last_name, first_name"
        ))?;
        let rows = stmt.query_map(params![like], contact_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_contact(&self, contact: &Contact) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE contacts SET first_name = ?1, last_name = ?2, email = ?3, phone = ?4,
                     role = ?5, company_id = ?6, notes = ?7, updated_at = ?8
                 WHERE id = ?9",
                params![
                    contact.first_name,
                    contact.last_name,
                    contact.email,
                    contact.phone,
                    contact.role,
                    contact.company_id,
                    contact.notes,
                    format_datetime(&contact.updated_at),
                    contact.id,
                ],
            )
            .map_err(constraint_to_validation)?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_contact(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM contacts WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn list_contact_leads(&self, contact_id: i64) -> Result<Vec<Lead>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {LEAD_COLS} FROM leads WHERE contact_id = ?1 ORDER BY updated_at DESC"
        ))?;
        let rows = stmt.query_map(params![contact_id], lead_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_contact_projects(&self, contact_id: i64) -> Result<Vec<Project>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROJECT_COLS} FROM projects WHERE contact_id = ?1 ORDER BY updated_at DESC"
        ))?;
        let rows = stmt.query_map(params![contact_id], project_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_contact_assets(&self, contact_id: i64) -> Result<Vec<Asset>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ASSET_COLS} FROM assets WHERE contact_id = ?1 ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map(params![contact_id], asset_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Lead operations

    fn create_lead(&self, lead: &Lead) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO leads (title, status, source, value_estimate, company_id, contact_id,
                 next_step, due_date, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                lead.title,
                lead.status.as_str(),
                lead.source,
                lead.value_estimate,
                lead.company_id,
                lead.contact_id,
                lead.next_step,
                lead.due_date.as_ref().map(format_datetime),
                lead.notes,
                format_datetime(&lead.created_at),
                format_datetime(&lead.updated_at),
            ],
        )
        .map_err(constraint_to_validation)?;
        Ok(conn.last_insert_rowid())
    }

    fn get_lead(&self, id: i64) -> Result<Option<Lead>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {LEAD_COLS} FROM leads WHERE id = ?1"),
            params![id],
            lead_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_leads(&self, status: Option<LeadStatus>) -> Result<Vec<Lead>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {LEAD_COLS} FROM leads
             WHERE ?1 IS NULL OR status = ?1
             ORDER BY updated_at DESC"
        ))?;
        let rows = stmt.query_map(params![status.map(|s| s.as_str())], lead_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_lead(&self, lead: &Lead) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE leads SET title = ?1, status = ?2, source = ?3, value_estimate = ?4,
                     company_id = ?5, contact_id = ?6, next_step = ?7, due_date = ?8,
                     notes = ?9, updated_at = ?10
                 WHERE id = ?11",
                params![
                    lead.title,
                    lead.status.as_str(),
                    lead.source,
                    lead.value_estimate,
                    lead.company_id,
                    lead.contact_id,
                    lead.next_step,
                    lead.due_date.as_ref().map(format_datetime),
                    lead.notes,
                    format_datetime(&lead.updated_at),
                    lead.id,
                ],
            )
            .map_err(constraint_to_validation)?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_lead(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM leads WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Idea operations

    fn create_idea(&self, idea: &Idea) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO ideas (title, status, tags, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                idea.title,
                idea.status.as_str(),
                idea.tags,
                idea.notes,
                format_datetime(&idea.created_at),
                format_datetime(&idea.updated_at),
            ],
        )
        .map_err(constraint_to_validation)?;
        Ok(conn.last_insert_rowid())
    }

    fn get_idea(&self, id: i64) -> Result<Option<Idea>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, title, status, tags, notes, created_at, updated_at
             FROM ideas WHERE id = ?1",
            params![id],
            idea_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_ideas(&self) -> Result<Vec<Idea>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, title, status, tags, notes, created_at, updated_at
             FROM ideas ORDER BY updated_at DESC",
        )?;
        let rows = stmt.query_map([], idea_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_idea(&self, idea: &Idea) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE ideas SET title = ?1, status = ?2, tags = ?3, notes = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                idea.title,
                idea.status.as_str(),
                idea.tags,
                idea.notes,
                format_datetime(&idea.updated_at),
                idea.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_idea(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM ideas WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Project operations

    fn create_project(&self, project: &Project) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO projects (name, status, company_id, contact_id, start_date, end_date,
                 budget, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                project.name,
                project.status.as_str(),
                project.company_id,
                project.contact_id,
                project.start_date.as_ref().map(format_datetime),
                project.end_date.as_ref().map(format_datetime),
                project.budget,
                project.notes,
                format_datetime(&project.created_at),
                format_datetime(&project.updated_at),
            ],
        )
        .map_err(constraint_to_validation)?;
        Ok(conn.last_insert_rowid())
    }

    fn get_project(&self, id: i64) -> Result<Option<Project>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PROJECT_COLS} FROM projects WHERE id = ?1"),
            params![id],
            project_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_projects(&self) -> Result<Vec<Project>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROJECT_COLS} FROM projects ORDER BY updated_at DESC"
        ))?;
        let rows = stmt.query_map([], project_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_project(&self, project: &Project) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE projects SET name = ?1, status = ?2, company_id = ?3, contact_id = ?4,
                     start_date = ?5, end_date = ?6, budget = ?7, notes = ?8, updated_at = ?9
                 WHERE id = ?10",
                params![
                    project.name,
                    project.status.as_str(),
                    project.company_id,
                    project.contact_id,
                    project.start_date.as_ref().map(format_datetime),
                    project.end_date.as_ref().map(format_datetime),
                    project.budget,
                    project.notes,
                    format_datetime(&project.updated_at),
                    project.id,
                ],
            )
            .map_err(constraint_to_validation)?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_project(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn list_project_tasks(&self, project_id: i64) -> Result<Vec<Task>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLS} FROM tasks WHERE project_id = ?1
             ORDER BY due_date IS NULL, due_date"
        ))?;
        let rows = stmt.query_map(params![project_id], task_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_project_assets(&self, project_id: i64) -> Result<Vec<Asset>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ASSET_COLS} FROM assets WHERE project_id = ?1 ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map(params![project_id], asset_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_project_events(&self, project_id: i64) -> Result<Vec<Event>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {EVENT_COLS} FROM events WHERE project_id = ?1 ORDER BY start DESC"
        ))?;
        let rows = stmt.query_map(params![project_id], event_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Task operations

    fn create_task(&self, task: &Task) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO tasks (project_id, title, status, due_date, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                task.project_id,
                task.title,
                task.status.as_str(),
                task.due_date.as_ref().map(format_datetime),
                task.notes,
                format_datetime(&task.created_at),
                format_datetime(&task.updated_at),
            ],
        )
        .map_err(constraint_to_validation)?;
        Ok(conn.last_insert_rowid())
    }

    fn get_task(&self, id: i64) -> Result<Option<Task>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TASK_COLS} FROM tasks WHERE id = ?1"),
            params![id],
            task_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_task(&self, task: &Task) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE tasks SET project_id = ?1, title = ?2, status = ?3, due_date = ?4,
                     notes = ?5, updated_at = ?6
                 WHERE id = ?7",
                params![
                    task.project_id,
                    task.title,
                    task.status.as_str(),
                    task.due_date.as_ref().map(format_datetime),
                    task.notes,
                    format_datetime(&task.updated_at),
                    task.id,
                ],
            )
            .map_err(constraint_to_validation)?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_task(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn list_open_tasks_due_between(
        &self,
        from: Option<&DateTime<Utc>>,
        to: Option<&DateTime<Utc>>,
    ) -> Result<Vec<Task>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLS} FROM tasks
             WHERE due_date IS NOT NULL AND status != 'DONE'
               AND (?1 IS NULL OR due_date >= ?1)
               AND (?2 IS NULL OR due_date <= ?2)
             ORDER BY due_date"
        ))?;
        let rows = stmt.query_map(
            params![from.map(format_datetime), to.map(format_datetime)],
            task_from_row,
        )?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Event operations

    fn create_event(&self, event: &Event) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO events (title, start, \"end\", all_day, project_id, contact_id,
                 location, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                event.title,
                format_datetime(&event.start),
                event.end.as_ref().map(format_datetime),
                event.all_day,
                event.project_id,
                event.contact_id,
                event.location,
                event.notes,
                format_datetime(&event.created_at),
                format_datetime(&event.updated_at),
            ],
        )
        .map_err(constraint_to_validation)?;
        Ok(conn.last_insert_rowid())
    }

    fn get_event(&self, id: i64) -> Result<Option<Event>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {EVENT_COLS} FROM events WHERE id = ?1"),
            params![id],
            event_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_events(&self) -> Result<Vec<Event>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {EVENT_COLS} FROM events ORDER BY start"
        ))?;
        let rows = stmt.query_map([], event_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_events_between(
        &self,
        from: Option<&DateTime<Utc>>,
        to: Option<&DateTime<Utc>>,
    ) -> Result<Vec<Event>> {
        let conn = self.conn();
        // A range match means the event overlaps [from, to]: it starts before
        // the range closes and ends (or starts, if open-ended) after it opens.
        let mut stmt = conn.prepare(&format!(
            "SELECT {EVENT_COLS} FROM events
             WHERE (?1 IS NULL OR COALESCE(\"end\", start) >= ?1)
               AND (?2 IS NULL OR start <= ?2)
             ORDER BY start"
        ))?;
        let rows = stmt.query_map(
            params![from.map(format_datetime), to.map(format_datetime)],
            event_from_row,
        )?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_event(&self, event: &Event) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE events SET title = ?1, start = ?2, \"end\" = ?3, all_day = ?4,
                     project_id = ?5, contact_id = ?6, location = ?7, notes = ?8, updated_at = ?9
                 WHERE id = ?10",
                params![
                    event.title,
                    format_datetime(&event.start),
                    event.end.as_ref().map(format_datetime),
                    event.all_day,
                    event.project_id,
                    event.contact_id,
                    event.location,
                    event.notes,
                    format_datetime(&event.updated_at),
                    event.id,
                ],
            )
            .map_err(constraint_to_validation)?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_event(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM events WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Asset operations

    fn create_asset(&self, asset: &Asset) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO assets (filename, stored_name, mime_type, size_bytes, tags,
                 project_id, contact_id, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                asset.filename,
                asset.stored_name,
                asset.mime_type,
                asset.size_bytes,
                asset.tags,
                asset.project_id,
                asset.contact_id,
                asset.notes,
                format_datetime(&asset.created_at),
            ],
        )
        .map_err(constraint_to_validation)?;
        Ok(conn.last_insert_rowid())
    }

    fn get_asset(&self, id: i64) -> Result<Option<Asset>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {ASSET_COLS} FROM assets WHERE id = ?1"),
            params![id],
            asset_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn find_duplicate_asset(
        &self,
        filename: &str,
        size_bytes: i64,
        mime_type: Option<&str>,
    ) -> Result<Option<Asset>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {ASSET_COLS} FROM assets
                 WHERE filename = ?1 AND size_bytes = ?2 AND mime_type IS ?3"
            ),
            params![filename, size_bytes, mime_type],
            asset_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_assets(&self, filter: &AssetFilter, limit: i64) -> Result<Vec<Asset>> {
        let conn = self.conn();
        let like = filter.q.as_deref().map(|q| format!("%{q}%"));
        let mut stmt = conn.prepare(&format!(
            "SELECT {ASSET_COLS} FROM assets
             WHERE (?1 IS NULL OR filename LIKE ?1 OR tags LIKE ?1 OR notes LIKE ?1)
               AND (?2 IS NULL OR project_id = ?2)
               AND (?3 IS NULL OR contact_id = ?3)
               AND (CASE ?4
                    WHEN 'image' THEN mime_type LIKE 'image/%'
                    WHEN 'video' THEN mime_type LIKE 'video/%'
                    WHEN 'document' THEN mime_type LIKE 'application/%'
                    WHEN 'other' THEN mime_type IS NULL
                        OR (mime_type NOT LIKE 'image/%'
                            AND mime_type NOT LIKE 'video/%'
                            AND mime_type NOT LIKE 'application/%')
                    ELSE 1
                    END)
             ORDER BY created_at DESC, id DESC
             LIMIT ?5"
        ))?;
        let rows = stmt.query_map(
            params![
                like,
                filter.project_id,
                filter.contact_id,
                filter.kind,
                limit
            ],
            asset_from_row,
        )?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_asset(&self, asset: &Asset) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE assets SET tags = ?1, project_id = ?2, contact_id = ?3, notes = ?4
                 WHERE id = ?5",
                params![
                    asset.tags,
                    asset.project_id,
                    asset.contact_id,
                    asset.notes,
                    asset.id,
                ],
            )
            .map_err(constraint_to_validation)?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_asset(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM assets WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Activity operations

    fn record_activity(&self, entry: &NewActivity) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO activity (ts, action, entity_type, entity_id, summary, changes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                format_datetime(&Utc::now()),
                entry.action.as_str(),
                entry.entity_type,
                entry.entity_id,
                entry.summary,
                entry.changes.as_ref().map(|v| v.to_string()),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn list_activity(&self, limit: i64, before: Option<&DateTime<Utc>>) -> Result<Vec<Activity>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, ts, action, entity_type, entity_id, summary, changes
             FROM activity
             WHERE ?1 IS NULL OR ts < ?1
             ORDER BY ts DESC, id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![before.map(format_datetime), limit], activity_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_entity_activity(
        &self,
        entity_type: &str,
        entity_id: i64,
        limit: i64,
    ) -> Result<Vec<Activity>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, ts, action, entity_type, entity_id, summary, changes
             FROM activity
             WHERE entity_type = ?1 AND entity_id = ?2
             ORDER BY ts DESC, id DESC
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![entity_type, entity_id, limit], activity_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn counts(&self) -> Result<Counts> {
        let conn = self.conn();
        let count = |sql: &str| -> Result<i64> {
            conn.query_row(sql, [], |row| row.get(0)).map_err(Error::from)
        };
        Ok(Counts {
            contacts: count("SELECT COUNT(*) FROM contacts")?,
            companies: count("SELECT COUNT(*) FROM companies")?,
            leads: count("SELECT COUNT(*) FROM leads")?,
            ideas: count("SELECT COUNT(*) FROM ideas")?,
            projects: count("SELECT COUNT(*) FROM projects")?,
            assets: count("SELECT COUNT(*) FROM assets")?,
            tasks_open: count("SELECT COUNT(*) FROM tasks WHERE status != 'DONE'")?,
        })
    }
}
