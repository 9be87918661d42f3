//! In-memory repositories backing `AppState::fake()` in tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::ads::repo::{Ad, AdField, AdFilter, AdRepository, NewAd};
use crate::db::{Pagination, RepoError};
use crate::info::repo::{Reference, ReferenceRepository};
use crate::users::repo::{ProfileTx, UserRepository};
use crate::users::repo_types::{
    NewUser, RoleKind, UserField, UserRecord, WorkerField, WorkerProfile, WorkerView,
};
use crate::workers::repo::WorkerRepository;

const SEED_CATEGORIES: &[&str] = &["Plumbing", "Electrical", "Carpentry", "Painting"];
const SEED_PRICE_UNITS: &[&str] = &["per hour", "per job"];

fn seeded(names: &[&str]) -> BTreeMap<i64, String> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| (i as i64 + 1, name.to_string()))
        .collect()
}

fn references(table: &BTreeMap<i64, String>) -> Vec<Reference> {
    table
        .iter()
        .map(|(id, name)| Reference {
            id: *id,
            name: name.clone(),
        })
        .collect()
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[derive(Debug, Clone, PartialEq)]
pub struct FakeData {
    users: BTreeMap<i64, UserRecord>,
    workers: BTreeMap<i64, WorkerProfile>,
    worker_categories: BTreeMap<i64, BTreeSet<i64>>,
    categories: BTreeMap<i64, String>,
    price_units: BTreeMap<i64, String>,
    ads: BTreeMap<i64, Ad>,
    next_user_id: i64,
    next_ad_id: i64,
}

impl Default for FakeData {
    fn default() -> Self {
        Self {
            users: BTreeMap::new(),
            workers: BTreeMap::new(),
            worker_categories: BTreeMap::new(),
            categories: seeded(SEED_CATEGORIES),
            price_units: seeded(SEED_PRICE_UNITS),
            ads: BTreeMap::new(),
            next_user_id: 1,
            next_ad_id: 1,
        }
    }
}

impl FakeData {
    fn view(&self, user_id: i64) -> Option<WorkerView> {
        let profile = self.workers.get(&user_id)?.clone();
        let name = self.users.get(&user_id)?.name.clone();
        let mut categories: Vec<String> = self
            .worker_categories
            .get(&user_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.categories.get(id).cloned())
            .collect();
        categories.sort();
        Some(WorkerView {
            profile,
            name,
            categories,
        })
    }

    /// Mirrors the foreign keys of the `ads` table.
    fn resolve_ad_names(&self, ad: &mut Ad) -> Result<(), RepoError> {
        let missing = || RepoError::InvalidReference("referenced entity does not exist".into());
        ad.category = self.categories.get(&ad.category_id).ok_or_else(missing)?.clone();
        ad.price_unit = self.price_units.get(&ad.price_unit_id).ok_or_else(missing)?.clone();
        Ok(())
    }

    fn category_id(&self, name: &str) -> Result<i64, RepoError> {
        self.categories
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name.trim()))
            .map(|(id, _)| *id)
            .ok_or_else(|| RepoError::InvalidReference(format!("category '{name}' not found")))
    }
}

#[derive(Clone, Default)]
pub struct FakeStore {
    data: Arc<Mutex<FakeData>>,
    fail_worker_updates: Arc<AtomicBool>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `update_worker_fields` fail with a storage error.
    pub fn fail_worker_updates(&self, fail: bool) {
        self.fail_worker_updates.store(fail, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> FakeData {
        self.data.lock().unwrap().clone()
    }

    pub fn user(&self, id: i64) -> Option<UserRecord> {
        self.data.lock().unwrap().users.get(&id).cloned()
    }

    pub fn user_count(&self) -> usize {
        self.data.lock().unwrap().users.len()
    }

    pub fn worker_profile(&self, user_id: i64) -> Option<WorkerProfile> {
        self.data.lock().unwrap().workers.get(&user_id).cloned()
    }

    pub fn ad_count(&self) -> usize {
        self.data.lock().unwrap().ads.len()
    }

    pub fn category_names(&self, user_id: i64) -> Vec<String> {
        self.data
            .lock()
            .unwrap()
            .view(user_id)
            .map(|v| v.categories)
            .unwrap_or_default()
    }
}

#[async_trait]
impl UserRepository for FakeStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        let data = self.data.lock().unwrap();
        Ok(data.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.user(id))
    }

    async fn create(&self, new_user: NewUser) -> Result<UserRecord, RepoError> {
        let mut data = self.data.lock().unwrap();
        if data.users.values().any(|u| u.email == new_user.email) {
            return Err(RepoError::Conflict("User already exists".into()));
        }
        let id = data.next_user_id;
        data.next_user_id += 1;
        let user = UserRecord {
            id,
            name: new_user.name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            role_id: new_user.role.id(),
            role_name: new_user.role.name().to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        data.users.insert(id, user.clone());
        if new_user.role == RoleKind::Worker {
            data.workers.insert(
                id,
                WorkerProfile {
                    user_id: id,
                    have_worker_profile: true,
                    ..WorkerProfile::default()
                },
            );
        }
        Ok(user)
    }

    async fn begin(&self) -> Result<Box<dyn ProfileTx>, RepoError> {
        let work = self.snapshot();
        Ok(Box::new(FakeTx {
            shared: Arc::clone(&self.data),
            work,
            fail_worker_updates: self.fail_worker_updates.load(Ordering::SeqCst),
        }))
    }
}

/// Works on a private copy; `commit` publishes it, dropping discards it.
struct FakeTx {
    shared: Arc<Mutex<FakeData>>,
    work: FakeData,
    fail_worker_updates: bool,
}

#[async_trait]
impl ProfileTx for FakeTx {
    async fn update_user_fields(
        &mut self,
        user_id: i64,
        fields: &[UserField],
    ) -> Result<u64, RepoError> {
        let Some(user) = self.work.users.get_mut(&user_id) else {
            return Ok(0);
        };
        for field in fields {
            match field {
                UserField::Name(name) => user.name = name.clone(),
            }
        }
        Ok(1)
    }

    async fn find_user(&mut self, user_id: i64) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.work.users.get(&user_id).cloned())
    }

    async fn update_worker_fields(
        &mut self,
        user_id: i64,
        fields: &[WorkerField],
    ) -> Result<u64, RepoError> {
        if self.fail_worker_updates {
            return Err(RepoError::Database(sqlx::Error::Protocol(
                "injected worker update failure".into(),
            )));
        }
        let known: BTreeSet<i64> = self.work.categories.keys().copied().collect();
        let Some(profile) = self.work.workers.get_mut(&user_id) else {
            return Ok(0);
        };
        profile.have_worker_profile = true;
        for field in fields {
            match field {
                WorkerField::Phone(v) => profile.phone = Some(v.clone()),
                WorkerField::ExpYears(v) => profile.exp_years = Some(*v),
                WorkerField::Description(v) => profile.description = Some(v.clone()),
                WorkerField::IsBusy(v) => profile.is_busy = *v,
                WorkerField::Location(v) => profile.location = Some(v.clone()),
                WorkerField::Schedule(v) => profile.schedule = Some(v.clone()),
                WorkerField::Categories(ids) => {
                    if let Some(missing) = ids.iter().find(|id| !known.contains(id)) {
                        return Err(RepoError::InvalidReference(format!(
                            "category {missing} not found"
                        )));
                    }
                    self.work
                        .worker_categories
                        .insert(user_id, ids.iter().copied().collect());
                }
            }
        }
        Ok(1)
    }

    async fn commit(self: Box<Self>) -> Result<(), RepoError> {
        *self.shared.lock().unwrap() = self.work;
        Ok(())
    }
}

#[async_trait]
impl WorkerRepository for FakeStore {
    async fn find_by_user_id(&self, user_id: i64) -> Result<Option<WorkerView>, RepoError> {
        Ok(self.data.lock().unwrap().view(user_id))
    }

    async fn list(&self, page: Pagination) -> Result<(Vec<WorkerView>, i64), RepoError> {
        let data = self.data.lock().unwrap();
        let active: Vec<i64> = data
            .workers
            .values()
            .filter(|w| w.have_worker_profile)
            .map(|w| w.user_id)
            .collect();
        let items = active
            .iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .filter_map(|id| data.view(*id))
            .collect();
        Ok((items, active.len() as i64))
    }

    async fn add_categories(&self, worker_id: i64, names: &[String]) -> Result<(), RepoError> {
        let mut data = self.data.lock().unwrap();
        let ids = names
            .iter()
            .map(|n| data.category_id(n))
            .collect::<Result<Vec<_>, _>>()?;
        data.worker_categories.entry(worker_id).or_default().extend(ids);
        Ok(())
    }

    async fn remove_categories(&self, worker_id: i64, names: &[String]) -> Result<(), RepoError> {
        let mut data = self.data.lock().unwrap();
        let ids = names
            .iter()
            .map(|n| data.category_id(n))
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(set) = data.worker_categories.get_mut(&worker_id) {
            for id in ids {
                set.remove(&id);
            }
        }
        Ok(())
    }
}

fn newest_first(ads: &mut [Ad]) {
    ads.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
}

#[async_trait]
impl AdRepository for FakeStore {
    async fn list(&self, filter: &AdFilter, page: Pagination) -> Result<(Vec<Ad>, i64), RepoError> {
        let data = self.data.lock().unwrap();
        let mut matching: Vec<Ad> = data
            .ads
            .values()
            .filter(|ad| {
                filter
                    .category
                    .as_deref()
                    .map_or(true, |c| contains_ignore_case(&ad.category, c))
            })
            .filter(|ad| {
                filter
                    .location
                    .as_deref()
                    .map_or(true, |l| contains_ignore_case(&ad.location, l))
            })
            .cloned()
            .collect();
        newest_first(&mut matching);
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn find(&self, id: i64) -> Result<Option<Ad>, RepoError> {
        Ok(self.data.lock().unwrap().ads.get(&id).cloned())
    }

    async fn list_by_owner(&self, user_id: i64) -> Result<Vec<Ad>, RepoError> {
        let data = self.data.lock().unwrap();
        let mut ads: Vec<Ad> = data
            .ads
            .values()
            .filter(|ad| ad.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut ads);
        Ok(ads)
    }

    async fn create(&self, user_id: i64, new_ad: &NewAd) -> Result<i64, RepoError> {
        let mut data = self.data.lock().unwrap();
        let id = data.next_ad_id;
        let mut ad = Ad {
            id,
            title: new_ad.title.clone(),
            price: new_ad.price,
            category_id: new_ad.category_id,
            category: String::new(),
            price_unit_id: new_ad.price_unit_id,
            price_unit: String::new(),
            user_id,
            location: new_ad.location.clone(),
            schedule: new_ad.schedule.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        data.resolve_ad_names(&mut ad)?;
        data.next_ad_id += 1;
        data.ads.insert(id, ad);
        Ok(id)
    }

    async fn update(&self, id: i64, user_id: i64, fields: &[AdField]) -> Result<bool, RepoError> {
        let mut data = self.data.lock().unwrap();
        let Some(mut ad) = data.ads.get(&id).filter(|ad| ad.user_id == user_id).cloned() else {
            return Ok(false);
        };
        for field in fields {
            match field {
                AdField::Title(v) => ad.title = v.clone(),
                AdField::Price(v) => ad.price = *v,
                AdField::CategoryId(v) => ad.category_id = *v,
                AdField::PriceUnitId(v) => ad.price_unit_id = *v,
                AdField::Location(v) => ad.location = v.clone(),
                AdField::Schedule(v) => ad.schedule = v.clone(),
            }
        }
        data.resolve_ad_names(&mut ad)?;
        data.ads.insert(id, ad);
        Ok(true)
    }

    async fn delete(&self, id: i64, user_id: i64) -> Result<bool, RepoError> {
        let mut data = self.data.lock().unwrap();
        if data.ads.get(&id).map_or(false, |ad| ad.user_id == user_id) {
            data.ads.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }
}

#[async_trait]
impl ReferenceRepository for FakeStore {
    async fn categories(&self) -> Result<Vec<Reference>, RepoError> {
        Ok(references(&self.data.lock().unwrap().categories))
    }

    async fn price_units(&self) -> Result<Vec<Reference>, RepoError> {
        Ok(references(&self.data.lock().unwrap().price_units))
    }

    async fn category_exists(&self, id: i64) -> Result<bool, RepoError> {
        Ok(self.data.lock().unwrap().categories.contains_key(&id))
    }

    async fn price_unit_exists(&self, id: i64) -> Result<bool, RepoError> {
        Ok(self.data.lock().unwrap().price_units.contains_key(&id))
    }
}
