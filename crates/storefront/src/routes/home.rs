//! Home page handler.

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;

use crate::catalog::Product;
use crate::state::AppState;

/// Number of products shown in each home page strip.
const STRIP_SIZE: usize = 8;

/// Home page data: featured and recent products.
#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub featured: Vec<Product>,
    pub recent: Vec<Product>,
}

/// Featured and recent product strips.
#[instrument(skip(state))]
pub async fn home(State(state): State<AppState>) -> Json<HomeResponse> {
    let catalog = state.catalog();
    Json(HomeResponse {
        featured: catalog.featured(STRIP_SIZE).into_iter().cloned().collect(),
        recent: catalog.recent(STRIP_SIZE).into_iter().cloned().collect(),
    })
}
