use crate::config::AppConfig;
use crate::data::Dataset;
use crate::pick::BoundaryIndex;
use crate::session::Session;
use crate::surface::{ElementState, RetainedSurface};
use crate::types::{CountryCode, CountryShape, Indicator};
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

pub struct AppState {
    // One lock for all events keeps them strictly sequential.
    pub session: Mutex<Session<RetainedSurface>>,
    pub index: BoundaryIndex,
}

#[derive(Deserialize)]
pub struct PickParams {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Serialize)]
pub struct CountryScene {
    code: CountryCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    shape: Option<ElementState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    point: Option<ElementState>,
}

#[derive(Debug, Serialize)]
pub struct SceneResponse {
    year: i32,
    first_year: i32,
    last_year: i32,
    focused: Option<CountryCode>,
    countries: Vec<CountryScene>,
}

#[derive(Debug, Serialize)]
pub struct CountryResponse {
    code: CountryCode,
    year: i32,
    values: BTreeMap<Indicator, Option<f64>>,
}

pub fn build_state(config: &AppConfig, data: Arc<Dataset>, boundaries: &[CountryShape]) -> Result<Arc<AppState>> {
    tracing::info!("Building boundary index for picking...");
    let index = BoundaryIndex::build(boundaries);
    let session = Session::new(config, data, boundaries, RetainedSurface::new())?;
    Ok(Arc::new(AppState { session: Mutex::new(session), index }))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/scene", get(scene_handler))
        .route("/api/year/:year", post(year_handler))
        .route("/api/hover/:code", post(hover_handler))
        .route("/api/leave", post(leave_handler))
        .route("/api/pick", get(pick_handler))
        .route("/api/country/:code", get(country_handler))
        .with_state(state)
}

pub async fn start_server(config: AppConfig, data: Arc<Dataset>, boundaries: Vec<CountryShape>) -> Result<()> {
    let state = build_state(&config, data, &boundaries)?;

    let port = config.server.port;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    tracing::info!("Starting server on http://{}", addr);

    let app = router(state)
        .fallback_service(ServeDir::new(&config.server.static_dir))
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn scene(session: &Session<RetainedSurface>) -> SceneResponse {
    let (first_year, last_year) = session.time().year_range(session.data());
    let surface = session.surface();
    let countries = session
        .views()
        .handles
        .iter()
        .map(|(code, pair)| CountryScene {
            code: code.clone(),
            shape: pair.shape.and_then(|id| surface.shape(id).copied()),
            point: pair.point.and_then(|id| surface.point(id).copied()),
        })
        .collect();

    SceneResponse {
        year: session.time().year(),
        first_year,
        last_year,
        focused: session.highlight().focused().cloned(),
        countries,
    }
}

async fn scene_handler(State(state): State<Arc<AppState>>) -> Json<SceneResponse> {
    let session = state.session.lock().await;
    Json(scene(&session))
}

async fn year_handler(
    State(state): State<Arc<AppState>>,
    Path(year): Path<i32>,
) -> Json<SceneResponse> {
    let mut session = state.session.lock().await;
    let shown = session.set_year(year);
    tracing::debug!(requested = year, shown, "Year changed");
    Json(scene(&session))
}

async fn hover_handler(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<SceneResponse>, StatusCode> {
    let mut session = state.session.lock().await;
    if !session.hover(&CountryCode::new(code)) {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(scene(&session)))
}

async fn leave_handler(State(state): State<Arc<AppState>>) -> Json<SceneResponse> {
    let mut session = state.session.lock().await;
    session.leave();
    Json(scene(&session))
}

/// Pointer position in map coordinates. Over a country it focuses that country, elsewhere it
/// behaves like leaving.
async fn pick_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PickParams>,
) -> Json<Option<CountryCode>> {
    let hit = state.index.locate(params.lon, params.lat).cloned();
    let mut session = state.session.lock().await;

    match &hit {
        Some(code) if session.highlight().focused() != Some(code) => {
            session.hover(code);
        }
        Some(_) => {}
        None if session.highlight().focused().is_some() => session.leave(),
        None => {}
    }

    Json(hit)
}

async fn country_handler(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<CountryResponse>, StatusCode> {
    let session = state.session.lock().await;
    let code = CountryCode::new(code);
    let data = session.data();
    let record = data.record(&code).ok_or(StatusCode::NOT_FOUND)?;
    let index = session.time().index();

    let values = Indicator::ALL
        .into_iter()
        .filter_map(|indicator| {
            let observation = record.observation(indicator, index.get())?;
            Some((indicator, observation.value()))
        })
        .collect();

    Ok(Json(CountryResponse { code, year: session.time().year(), values }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CountryRecord, Observation::*};
    use geo::{polygon, MultiPolygon};

    fn state() -> Arc<AppState> {
        let config = AppConfig::from_toml("[input]\ndataset = \"d.json\"\nboundaries = \"b.geojson\"\n").unwrap();
        let usa = CountryRecord::new()
            .with_series(Indicator::Gdp, vec![Value(1e13), Missing])
            .with_series(Indicator::PopulationGrowth, vec![Value(1.0), Value(0.9)])
            .with_series(Indicator::PopulationTotal, vec![Value(3e8), Value(3.3e8)])
            .with_series(Indicator::WorkingAge, vec![Value(66.0), Value(65.0)]);
        let data = Arc::new(Dataset::from_records(2019, vec![(CountryCode::from("USA"), usa)]));
        let square = polygon![(x: -100.0, y: 30.0), (x: -90.0, y: 30.0), (x: -90.0, y: 40.0), (x: -100.0, y: 40.0), (x: -100.0, y: 30.0)];
        let shapes = vec![CountryShape { code: CountryCode::from("USA"), geometry: MultiPolygon::new(vec![square]) }];
        build_state(&config, data, &shapes).unwrap()
    }

    #[tokio::test]
    async fn year_handler_clamps_and_reencodes() {
        let state = state();
        let Json(scene) = year_handler(State(state.clone()), Path(1990)).await;
        assert_eq!(scene.year, 2019);
        assert_eq!((scene.first_year, scene.last_year), (2019, 2020));
        assert!(scene.countries[0].point.unwrap().r.unwrap() > 0.0);

        let Json(scene) = year_handler(State(state), Path(2020)).await;
        assert_eq!(scene.countries[0].point.unwrap().r, Some(0.0));
    }

    #[tokio::test]
    async fn year_handler_clamps_integer_extremes() {
        let state = state();
        let Json(scene) = year_handler(State(state.clone()), Path(i32::MIN)).await;
        assert_eq!(scene.year, 2019);
        let Json(scene) = year_handler(State(state), Path(i32::MAX)).await;
        assert_eq!(scene.year, 2020);
    }

    #[tokio::test]
    async fn hover_unknown_country_is_not_found() {
        let result = hover_handler(State(state()), Path("ZZZ".to_string())).await;
        assert_eq!(result.err(), Some(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn pick_focuses_then_leaves() {
        let state = state();
        let Json(hit) = pick_handler(State(state.clone()), Query(PickParams { lat: 35.0, lon: -95.0 })).await;
        assert_eq!(hit, Some(CountryCode::from("USA")));
        assert_eq!(state.session.lock().await.highlight().focused(), Some(&CountryCode::from("USA")));

        let Json(hit) = pick_handler(State(state.clone()), Query(PickParams { lat: 0.0, lon: 0.0 })).await;
        assert_eq!(hit, None);
        assert!(state.session.lock().await.highlight().focused().is_none());
    }

    #[tokio::test]
    async fn country_handler_reports_current_values() {
        let state = state();
        let Json(scene) = year_handler(State(state.clone()), Path(2020)).await;
        assert_eq!(scene.year, 2020);
        let Json(body) = country_handler(State(state.clone()), Path("USA".to_string())).await.unwrap();
        assert_eq!(body.year, 2020);
        assert_eq!(body.values[&Indicator::Gdp], None);
        assert_eq!(body.values[&Indicator::WorkingAge], Some(65.0));

        let missing = country_handler(State(state), Path("ABC".to_string())).await;
        assert_eq!(missing.err(), Some(StatusCode::NOT_FOUND));
    }
}
