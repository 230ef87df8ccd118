//! Tree library and tree information endpoints
//!
//! The overview and every section are separate routes, each doing its own
//! backend fetch, so one failing section never hides the others.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use lens_common::{species, Species};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::services::tree_detail_client::{
    LocationView, SectionView, TextSection, TreeOverview, TreeRecord, OVERVIEW_FAILED,
    SECTION_FAILED,
};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct LibraryQuery {
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LibraryResponse {
    pub trees: Vec<LibraryItem>,
    /// Shown when the search matched nothing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LibraryItem {
    pub tree_id: String,
    pub name: String,
    pub scientific_name: String,
    pub detail_path: String,
}

impl From<Species> for LibraryItem {
    fn from(species: Species) -> Self {
        Self {
            tree_id: species.id().to_string(),
            name: species.display_name(),
            scientific_name: species.scientific_name().to_string(),
            detail_path: format!("/api/trees/{}", species.id()),
        }
    }
}

/// GET /api/trees?q=
pub async fn list_trees(Query(query): Query<LibraryQuery>) -> Json<LibraryResponse> {
    let matches = species::search(query.q.as_deref().unwrap_or(""));
    let message = if matches.is_empty() {
        Some("No trees found matching your search.".to_string())
    } else {
        None
    };

    Json(LibraryResponse {
        trees: matches.into_iter().map(LibraryItem::from).collect(),
        message,
    })
}

/// GET /api/trees/:id
pub async fn tree_overview(
    State(state): State<AppState>,
    Path(tree_id): Path<String>,
) -> ApiResult<Json<TreeOverview>> {
    let species = known_species(&tree_id)?;
    let record = fetch_record(&state, species, OVERVIEW_FAILED).await?;
    Ok(Json(TreeOverview::from_record(species, &record)))
}

/// GET /api/trees/:id/growth-needs
pub async fn growth_needs(
    state: State<AppState>,
    tree_id: Path<String>,
) -> ApiResult<Json<SectionView>> {
    text_section(state, tree_id, TextSection::GrowthNeeds).await
}

/// GET /api/trees/:id/growth-period
pub async fn growth_period(
    state: State<AppState>,
    tree_id: Path<String>,
) -> ApiResult<Json<SectionView>> {
    text_section(state, tree_id, TextSection::GrowthPeriod).await
}

/// GET /api/trees/:id/lifespan
pub async fn lifespan(
    state: State<AppState>,
    tree_id: Path<String>,
) -> ApiResult<Json<SectionView>> {
    text_section(state, tree_id, TextSection::Lifespan).await
}

/// GET /api/trees/:id/location
pub async fn location(
    State(state): State<AppState>,
    Path(tree_id): Path<String>,
) -> ApiResult<Json<LocationView>> {
    let species = known_species(&tree_id)?;
    let record = fetch_record(&state, species, SECTION_FAILED).await?;
    Ok(Json(LocationView::from_record(species.id(), &record)))
}

async fn text_section(
    State(state): State<AppState>,
    Path(tree_id): Path<String>,
    section: TextSection,
) -> ApiResult<Json<SectionView>> {
    let species = known_species(&tree_id)?;
    let record = fetch_record(&state, species, section.failure_message()).await?;
    Ok(Json(section.render(species.id(), &record)))
}

fn known_species(tree_id: &str) -> ApiResult<Species> {
    Species::from_id(tree_id)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown tree id: {}", tree_id)))
}

async fn fetch_record(
    state: &AppState,
    species: Species,
    failure_message: &str,
) -> ApiResult<TreeRecord> {
    state.details.fetch(species.id()).await.map_err(|e| {
        error!(tree_id = species.id(), error = %e, "Failed to fetch tree details");
        ApiError::BadGateway(failure_message.to_string())
    })
}

/// Build tree library and information routes
pub fn tree_routes() -> Router<AppState> {
    Router::new()
        .route("/api/trees", get(list_trees))
        .route("/api/trees/:id", get(tree_overview))
        .route("/api/trees/:id/growth-needs", get(growth_needs))
        .route("/api/trees/:id/growth-period", get(growth_period))
        .route("/api/trees/:id/lifespan", get(lifespan))
        .route("/api/trees/:id/location", get(location))
}
