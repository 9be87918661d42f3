use serde::{Deserialize, Serialize};

use super::reconciler::{ProfileView, UpdatedProfile};
use super::repo_types::{ProfileUpdate, UserField, WorkerField};
use crate::error::AppError;

/// PATCH /profile body. Absent (or null) fields are left untouched.
#[derive(Debug, Default, Deserialize)]
pub struct PatchProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub exp_years: Option<i32>,
    pub description: Option<String>,
    pub is_busy: Option<bool>,
    pub location: Option<String>,
    pub schedule: Option<String>,
    pub categories: Option<Vec<i64>>,
}

impl TryFrom<PatchProfileRequest> for ProfileUpdate {
    type Error = AppError;

    fn try_from(req: PatchProfileRequest) -> Result<Self, Self::Error> {
        let mut update = ProfileUpdate::default();

        if let Some(name) = req.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(AppError::bad_request("name cannot be empty"));
            }
            update.user.push(UserField::Name(name));
        }

        if let Some(v) = req.phone {
            update.worker.push(WorkerField::Phone(v));
        }
        if let Some(v) = req.exp_years {
            if v < 0 {
                return Err(AppError::bad_request("exp_years cannot be negative"));
            }
            update.worker.push(WorkerField::ExpYears(v));
        }
        if let Some(v) = req.description {
            update.worker.push(WorkerField::Description(v));
        }
        if let Some(v) = req.is_busy {
            update.worker.push(WorkerField::IsBusy(v));
        }
        if let Some(v) = req.location {
            update.worker.push(WorkerField::Location(v));
        }
        if let Some(v) = req.schedule {
            update.worker.push(WorkerField::Schedule(v));
        }
        if let Some(mut ids) = req.categories {
            ids.sort_unstable();
            ids.dedup();
            update.worker.push(WorkerField::Categories(ids));
        }

        Ok(update)
    }
}

#[derive(Debug, Serialize)]
pub struct WorkerSection {
    pub specialization: Vec<String>,
    pub experience: Option<i32>,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub is_busy: bool,
    pub location: Option<String>,
    pub schedule: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: String,
    pub have_worker_profile: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker: Option<WorkerSection>,
}

impl From<ProfileView> for ProfileResponse {
    fn from(view: ProfileView) -> Self {
        let worker = view.worker.map(|w| WorkerSection {
            specialization: w.categories,
            experience: w.profile.exp_years,
            description: w.profile.description,
            phone: w.profile.phone,
            is_busy: w.profile.is_busy,
            location: w.profile.location,
            schedule: w.profile.schedule,
        });
        Self {
            id: view.user.id,
            email: view.user.email,
            name: view.user.name,
            role: view.user.role_name,
            have_worker_profile: worker.is_some(),
            worker,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UpdatedProfileResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: String,
    pub have_worker_profile: bool,
    pub updated_fields: Vec<&'static str>,
}

impl From<UpdatedProfile> for UpdatedProfileResponse {
    fn from(u: UpdatedProfile) -> Self {
        Self {
            id: u.user.id,
            email: u.user.email,
            name: u.user.name,
            role: u.user.role_name,
            have_worker_profile: u.have_worker_profile,
            updated_fields: u.updated_fields,
        }
    }
}
