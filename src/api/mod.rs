//! API module
//!
//! HTTP endpoints, middleware, and the shared application state.

pub mod middleware;
pub mod routes;

pub use routes::create_router;

use std::sync::Arc;

use crate::adapter::{AccountNumberGenerator, CustomerDirectory};
use crate::store::AccountStore;

/// Dependencies shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AccountStore>,
    pub customers: Arc<dyn CustomerDirectory>,
    pub numbers: Arc<dyn AccountNumberGenerator>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn AccountStore>,
        customers: Arc<dyn CustomerDirectory>,
        numbers: Arc<dyn AccountNumberGenerator>,
    ) -> Self {
        Self {
            store,
            customers,
            numbers,
        }
    }
}
