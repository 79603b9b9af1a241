//! Business logic services

pub mod auth;
pub mod catalog;
pub mod circulation;
pub mod fines;
pub mod permissions;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub catalog: catalog::CatalogService,
    pub circulation: circulation::CirculationService,
    pub fines: fines::FinesService,
    pub repository: Repository,
}

impl Services {
    /// Create all services over one repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        let lock: circulation::CirculationLock = Arc::new(Mutex::new(()));
        let circulation = circulation::CirculationService::new(
            repository.clone(),
            config.circulation.clone(),
            lock.clone(),
        );

        Self {
            auth: auth::AuthService::new(repository.clone(), config.auth.clone()),
            catalog: catalog::CatalogService::new(repository.clone(), circulation.clone(), lock),
            circulation,
            fines: fines::FinesService::new(repository.clone()),
            repository,
        }
    }
}
