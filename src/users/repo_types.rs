use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// Tenant type. Ids match the seeded `roles` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleKind {
    Client,
    Worker,
}

impl RoleKind {
    pub const fn id(self) -> i64 {
        match self {
            RoleKind::Client => 1,
            RoleKind::Worker => 2,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(RoleKind::Client),
            2 => Some(RoleKind::Worker),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            RoleKind::Client => "client",
            RoleKind::Worker => "worker",
        }
    }
}

/// User row joined with its role name.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 PHC string, never exposed
    pub role_id: i64,
    pub role_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: RoleKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, FromRow)]
pub struct WorkerProfile {
    pub user_id: i64,
    pub exp_years: Option<i32>,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub is_busy: bool,
    pub location: Option<String>,
    pub schedule: Option<String>,
    pub have_worker_profile: bool,
}

/// Worker profile with owner identity and resolved category names.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerView {
    #[serde(flatten)]
    pub profile: WorkerProfile,
    pub name: String,
    pub categories: Vec<String>,
}

/// User-level columns a profile edit may touch.
#[derive(Debug, Clone, PartialEq)]
pub enum UserField {
    Name(String),
}

impl UserField {
    pub fn key(&self) -> &'static str {
        match self {
            UserField::Name(_) => "name",
        }
    }
}

/// WorkerProfile-level columns a profile edit may touch.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerField {
    Phone(String),
    ExpYears(i32),
    Description(String),
    IsBusy(bool),
    Location(String),
    Schedule(String),
    Categories(Vec<i64>),
}

impl WorkerField {
    pub fn key(&self) -> &'static str {
        match self {
            WorkerField::Phone(_) => "phone",
            WorkerField::ExpYears(_) => "exp_years",
            WorkerField::Description(_) => "description",
            WorkerField::IsBusy(_) => "is_busy",
            WorkerField::Location(_) => "location",
            WorkerField::Schedule(_) => "schedule",
            WorkerField::Categories(_) => "categories",
        }
    }
}

/// Sparse profile edit, already split by owning table. Only supplied fields appear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub user: Vec<UserField>,
    pub worker: Vec<WorkerField>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.user.is_empty() && self.worker.is_empty()
    }

    pub fn keys(&self) -> Vec<&'static str> {
        self.user
            .iter()
            .map(UserField::key)
            .chain(self.worker.iter().map(WorkerField::key))
            .collect()
    }
}
