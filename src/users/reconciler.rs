//! Reads and edits the combined user + worker profile view.
//!
//! Edits run in a single transaction over both tables: the user row first, then the
//! worker profile row. A user without a worker profile row keeps having none; worker
//! fields sent by such a user touch zero rows and are otherwise ignored.

use tracing::{debug, info, instrument};

use super::repo::UserRepository;
use super::repo_types::{ProfileUpdate, UserRecord, WorkerView};
use crate::auth::extractors::Principal;
use crate::error::AppError;
use crate::workers::repo::WorkerRepository;

#[derive(Debug, Clone)]
pub struct ProfileView {
    pub user: UserRecord,
    pub worker: Option<WorkerView>,
}

#[derive(Debug, Clone)]
pub struct UpdatedProfile {
    pub user: UserRecord,
    pub have_worker_profile: bool,
    pub updated_fields: Vec<&'static str>,
}

#[instrument(skip(users, workers), fields(user_id = principal.user_id))]
pub async fn get_profile(
    users: &dyn UserRepository,
    workers: &dyn WorkerRepository,
    principal: &Principal,
) -> Result<ProfileView, AppError> {
    let user = users
        .find_by_id(principal.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    let worker = workers.find_by_user_id(principal.user_id).await?;
    Ok(ProfileView { user, worker })
}

#[instrument(skip(users, workers, update), fields(user_id = principal.user_id))]
pub async fn update_profile(
    users: &dyn UserRepository,
    workers: &dyn WorkerRepository,
    principal: &Principal,
    update: ProfileUpdate,
) -> Result<UpdatedProfile, AppError> {
    if update.is_empty() {
        return Err(AppError::bad_request("no fields to update"));
    }
    let user_id = principal.user_id;

    // Any early return drops `tx`, which rolls back whatever was already applied.
    let mut tx = users.begin().await?;

    if !update.user.is_empty() {
        let affected = tx.update_user_fields(user_id, &update.user).await?;
        if affected == 0 {
            return Err(AppError::not_found("User not found"));
        }
    }

    let current = tx
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    if !update.worker.is_empty() {
        let affected = tx.update_worker_fields(user_id, &update.worker).await?;
        if affected == 0 {
            debug!(
                role = %current.role_name,
                "no worker profile row; worker fields ignored"
            );
        }
    }

    tx.commit().await?;

    let user = users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    let have_worker_profile = workers.find_by_user_id(user_id).await?.is_some();
    let updated_fields = update.keys();

    info!(?updated_fields, have_worker_profile, "profile updated");
    Ok(UpdatedProfile {
        user,
        have_worker_profile,
        updated_fields,
    })
}
