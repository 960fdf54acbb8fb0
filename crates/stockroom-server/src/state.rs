//! Shared application state.

use std::sync::Arc;

use stockroom_auth::{AuthConfig, AuthService};
use stockroom_core::ProductLifecycle;
use stockroom_core::directory::DirectoryService;
use stockroom_db::repository::{
    SurrealAssignmentRepository, SurrealDispatchGuideRepository, SurrealExternalActRepository,
    SurrealProductModelRepository, SurrealProductRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::any::Any;

use crate::upload::UploadStore;

/// The engine every repository is instantiated over. `Any` covers
/// both remote deployments and embedded in-memory instances (tests,
/// local development).
pub type Db = Any;

pub type Lifecycle = ProductLifecycle<
    SurrealProductRepository<Db>,
    SurrealAssignmentRepository<Db>,
    SurrealDispatchGuideRepository<Db>,
    SurrealProductModelRepository<Db>,
>;

pub type Auth = AuthService<SurrealUserRepository<Db>>;

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<Lifecycle>,
    pub auth: Arc<Auth>,
    pub auth_config: Arc<AuthConfig>,
    pub users: SurrealUserRepository<Db>,
    pub guides: SurrealDispatchGuideRepository<Db>,
    pub models: SurrealProductModelRepository<Db>,
    pub acts: SurrealExternalActRepository<Db>,
    pub directory: Arc<DirectoryService>,
    pub uploads: Arc<UploadStore>,
}

impl AppState {
    pub fn new(
        db: Surreal<Db>,
        auth_config: AuthConfig,
        uploads: UploadStore,
        directory: DirectoryService,
    ) -> Self {
        let users = match &auth_config.pepper {
            Some(pepper) => SurrealUserRepository::with_pepper(db.clone(), pepper.clone()),
            None => SurrealUserRepository::new(db.clone()),
        };

        let lifecycle = ProductLifecycle::new(
            SurrealProductRepository::new(db.clone()),
            SurrealAssignmentRepository::new(db.clone()),
            SurrealDispatchGuideRepository::new(db.clone()),
            SurrealProductModelRepository::new(db.clone()),
        );

        Self {
            lifecycle: Arc::new(lifecycle),
            auth: Arc::new(AuthService::new(users.clone(), auth_config.clone())),
            auth_config: Arc::new(auth_config),
            users,
            guides: SurrealDispatchGuideRepository::new(db.clone()),
            models: SurrealProductModelRepository::new(db.clone()),
            acts: SurrealExternalActRepository::new(db),
            directory: Arc::new(directory),
            uploads: Arc::new(uploads),
        }
    }
}
