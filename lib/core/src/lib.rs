pub mod actor;
pub mod config;
pub mod error;
pub mod module;
pub mod types;

pub use actor::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER, Actor, Role};
pub use config::ServiceConfig;
pub use error::ServiceError;
pub use module::Module;
pub use types::{PageParams, Pagination, new_id, now_rfc3339};
