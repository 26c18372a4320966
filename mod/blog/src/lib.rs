//! Blog module: content publishing with accounts, comments, and
//! engagement.
//!
//! # Resources
//!
//! - **Post**: authored article with derived slug, excerpt, and read
//!   time; draft/published/archived lifecycle
//! - **Comment**: reader response, one level of replies
//! - **Account**: author or reader identity with profile and follows
//! - **Likes / Bookmarks / Follows**: toggleable relationships held
//!   in join tables
//!
//! # Usage
//!
//! ```ignore
//! use blog::BlogModule;
//!
//! let module = BlogModule::new(sql)?;
//! let router = module.routes(); // Mount under /blog
//! ```

pub mod api;
pub mod model;
pub mod service;

use std::sync::Arc;

use axum::Router;

use byline_core::Module;
use byline_sql::SQLStore;

use crate::service::BlogService;

/// Blog module implementing the Module trait.
///
/// Holds the BlogService and provides HTTP routes for every blog
/// endpoint.
pub struct BlogModule {
    service: Arc<BlogService>,
}

impl BlogModule {
    /// Create a new BlogModule. Runs schema setup against the store.
    pub fn new(sql: Arc<dyn SQLStore>) -> Result<Self, byline_core::ServiceError> {
        let service = BlogService::new(sql)?;
        Ok(Self { service })
    }

    /// Get a reference to the underlying BlogService.
    pub fn service(&self) -> &Arc<BlogService> {
        &self.service
    }
}

impl Module for BlogModule {
    fn name(&self) -> &str {
        "blog"
    }

    fn routes(&self) -> Router {
        api::router(self.service.clone())
    }
}
