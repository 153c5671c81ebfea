use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tabx_matcher::{QueryMatcher, SnapshotBuilder};
use tabx_templates::{AccessKind, Template};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

const DEFAULT_MISS_LIMIT: usize = 100;

/// Shared state of every worker
pub struct AppState {
    pub matcher: Arc<QueryMatcher>,
    pub builder: Arc<SnapshotBuilder>,
    /// Dataset file re-read on reload
    pub dataset: PathBuf,
}

impl AppState {
    pub fn new(matcher: Arc<QueryMatcher>, builder: Arc<SnapshotBuilder>, dataset: PathBuf) -> Self {
        Self {
            matcher,
            builder,
            dataset,
        }
    }
}

#[derive(Deserialize)]
struct QueryRequest {
    #[serde(rename = "userInput", default)]
    user_input: String,
}

#[derive(Deserialize)]
struct MissesQuery {
    limit: Option<usize>,
}

#[derive(Serialize)]
struct TemplateSummary<'a> {
    id: &'a str,
    pattern: &'a str,
    target_columns: &'a [String],
    access_kind: AccessKind,
    canonical_phrase: &'a str,
}

impl<'a> From<&'a Template> for TemplateSummary<'a> {
    fn from(template: &'a Template) -> Self {
        Self {
            id: &template.id,
            pattern: &template.pattern,
            target_columns: &template.target_columns,
            access_kind: template.access_kind,
            canonical_phrase: &template.canonical_phrase,
        }
    }
}

pub struct RestApi;

impl RestApi {
    pub async fn start(state: Arc<AppState>, port: u16) -> std::io::Result<()> {
        let data = web::Data::from(state);
        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .app_data(data.clone())
                .configure(configure)
        })
        .bind(("0.0.0.0", port))?
        .run()
        .await
    }
}

/// Register all routes; expects `web::Data<AppState>` in app data
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/query", web::post().to(query))
        .route("/schema", web::get().to(get_schema))
        .route("/templates", web::get().to(list_templates))
        .route("/misses", web::get().to(list_misses))
        .route("/admin/reload", web::post().to(reload))
        .route("/health", web::get().to(health));
}

async fn query(
    state: web::Data<AppState>,
    req: web::Json<QueryRequest>,
) -> ActixResult<HttpResponse> {
    let input = req.user_input.trim();
    if input.is_empty() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Empty userInput"
        })));
    }

    let span = info_span!("query", request_id = %Uuid::new_v4());
    let response = state.matcher.match_input_bounded(input).instrument(span).await;
    Ok(HttpResponse::Ok().json(response))
}

async fn get_schema(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let snapshot = state.matcher.snapshots().load();
    Ok(HttpResponse::Ok().json(snapshot.schema()))
}

async fn list_templates(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let snapshot = state.matcher.snapshots().load();
    let templates: Vec<TemplateSummary> = snapshot.templates().iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "generation": snapshot.generation(),
        "templates": templates,
    })))
}

async fn list_misses(
    state: web::Data<AppState>,
    query: web::Query<MissesQuery>,
) -> ActixResult<HttpResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_MISS_LIMIT);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "misses": state.matcher.misses().recent(limit)
    })))
}

async fn reload(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let task_state = state.clone();
    let outcome = web::block(move || {
        task_state
            .matcher
            .snapshots()
            .reload(&task_state.builder, &task_state.dataset)
    })
    .await?;

    match outcome {
        Ok(generation) => {
            info!("Reloaded {:?} as generation {}", state.dataset, generation);
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "result": true,
                "generation": generation
            })))
        }
        Err(e) => {
            warn!("Reload of {:?} failed: {}", state.dataset, e);
            Ok(HttpResponse::UnprocessableEntity().json(serde_json::json!({
                "error": e.to_string()
            })))
        }
    }
}

async fn health(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let snapshot = state.matcher.snapshots().load();
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "generation": snapshot.generation(),
        "rows": snapshot.schema().row_count(),
        "templates": snapshot.index().len(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test};
    use serde_json::{json, Value};
    use tabx_core::PhraseEmbedder;
    use tabx_matcher::{MatcherConfig, SnapshotHandle};

    const PRODUCTS: &str = "ProductCode,ProductDescription,ProductPrice\n\
        PI-1234,red bicycle,129.99\n\
        PI-1235,blue kite,19.50\n\
        PI-1236,green tent,250\n";

    fn state(dir: &std::path::Path) -> web::Data<AppState> {
        let dataset = dir.join("products.csv");
        std::fs::write(&dataset, PRODUCTS).unwrap();

        let builder = Arc::new(SnapshotBuilder::new(Arc::new(PhraseEmbedder::default())));
        let snapshot = builder.build_from_csv(&dataset, 1).unwrap();
        let matcher = QueryMatcher::new(Arc::new(SnapshotHandle::new(snapshot)), MatcherConfig::default());
        web::Data::new(AppState::new(Arc::new(matcher), builder, dataset))
    }

    #[actix_web::test]
    async fn test_query_hit() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(state(dir.path())).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/query")
            .set_json(json!({"userInput": "what is the price of PI-1234"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["any_hit"], true);
        assert_eq!(body["queries"][0]["template"], "what is the price of {ITEM}");
        assert_eq!(body["queries"][0]["result"], json!({"ProductPrice": 129.99}));
    }

    #[actix_web::test]
    async fn test_empty_input_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(state(dir.path())).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/query")
            .set_json(json!({"userInput": "   "}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"error": "Empty userInput"}));
    }

    #[actix_web::test]
    async fn test_templates_omit_embeddings() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(state(dir.path())).configure(configure)).await;

        let req = test::TestRequest::get().uri("/templates").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        let templates = body["templates"].as_array().unwrap();
        assert!(!templates.is_empty());
        assert!(templates.iter().all(|t| t.get("canonical_embedding").is_none()));
        assert_eq!(templates[0]["id"], "t0");
    }

    #[actix_web::test]
    async fn test_reload_publishes_new_generation() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        std::fs::write(&state.dataset, format!("{}PI-1237,yellow scooter,89\n", PRODUCTS)).unwrap();
        let req = test::TestRequest::post().uri("/admin/reload").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["generation"], 2);

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["rows"], 4);
    }

    #[actix_web::test]
    async fn test_failed_reload_keeps_serving() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        std::fs::write(&state.dataset, "ProductCode,ProductPrice\n").unwrap();
        let req = test::TestRequest::post().uri("/admin/reload").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["generation"], 1);
        assert_eq!(body["rows"], 3);
    }

    #[actix_web::test]
    async fn test_misses_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(state(dir.path())).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/query")
            .set_json(json!({"userInput": "what is the color of XYZ"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["any_hit"], false);
        assert!(body["queries"][0]["template"].is_null());

        let req = test::TestRequest::get().uri("/misses?limit=5").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["misses"][0]["query"], "what is the color of XYZ");
        assert_eq!(body["misses"][0]["reason"], "no_template_match");
    }
}
