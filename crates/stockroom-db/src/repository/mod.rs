//! SurrealDB repository implementations.

mod assignment;
mod dispatch_guide;
mod external_act;
mod product;
mod product_model;
mod user;

pub use assignment::SurrealAssignmentRepository;
pub use dispatch_guide::SurrealDispatchGuideRepository;
pub use external_act::SurrealExternalActRepository;
pub use product::SurrealProductRepository;
pub use product_model::SurrealProductModelRepository;
pub use user::SurrealUserRepository;
