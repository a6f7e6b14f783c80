use axum::extract::{FromRef, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::{RequireLogin, RequireUser, SessionManager};
use crate::catalog::{DatasetEntry, NewDatasetFields, PanelName};
use crate::dataset_manager::DatasetManager;
use crate::error::ServiceError;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<DatasetManager>,
    pub sessions: SessionManager,
}

impl FromRef<AppState> for SessionManager {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

/// A rendered page: the template an external renderer would use plus
/// its context. HTML itself is out of scope here.
#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
    pub template: &'static str,
    #[serde(flatten)]
    pub context: T,
}

impl<T: Serialize> IntoResponse for Page<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

pub struct WebServer {
    state: AppState,
}

impl WebServer {
    pub fn new(manager: Arc<DatasetManager>) -> Self {
        Self {
            state: AppState {
                manager,
                sessions: SessionManager::new(),
            },
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/healthz", get(health))
            .route("/login", post(login))
            .route("/datasets", get(dataset_list).post(dataset_create))
            .route("/api/datasets", get(api_dataset_list).post(api_dataset_create))
            .route(
                "/api/datasets/:id",
                get(api_dataset_get)
                    .put(api_dataset_update)
                    .delete(api_dataset_delete),
            )
            .route(
                "/api/stars",
                get(api_star_list)
                    .post(api_star_create)
                    .delete(api_star_destroy),
            )
            .route("/:account/:slug", get(dataset_detail))
            .route("/:account/:slug/schema", get(dataset_schema))
            .route("/:account/:slug/explore", get(dataset_explore))
            .route("/:account/:slug/settings", get(dataset_settings))
            .route("/:account/:slug/upload", post(file_upload))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    pub async fn start(&self, addr: SocketAddr) -> Result<(), ServiceError> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("HTTP server listening on {}", addr);
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    name: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    token: String,
    user_id: i32,
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ServiceError> {
    let (token, account) = state
        .sessions
        .login(state.manager.store(), &request.name)
        .await?;

    Ok(Json(LoginResponse {
        token,
        user_id: account.id,
    }))
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<i64>,
}

async fn dataset_list(
    RequireLogin(_user): RequireLogin,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Page<crate::catalog::DatasetListPage>, ServiceError> {
    let page = state.manager.list_page(query.page.unwrap_or(1)).await?;
    Ok(Page {
        template: "dataset/list.html",
        context: page,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CreateDatasetForm {
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Serialize)]
struct CreateFormContext {
    form: CreateDatasetForm,
    form_errors: Vec<String>,
}

async fn dataset_create(
    RequireLogin(user): RequireLogin,
    State(state): State<AppState>,
    Form(form): Form<CreateDatasetForm>,
) -> Result<Response, ServiceError> {
    match state
        .manager
        .create_dataset(user.id, &form.name, &form.description)
        .await
    {
        Ok(dataset) => Ok(Redirect::to(&dataset.absolute_url()).into_response()),
        Err(err @ (ServiceError::DuplicateDatasetName | ServiceError::ValidationError { .. })) => {
            // Uniqueness and field failures re-render the form, never 5xx.
            Ok(Page {
                template: "dataset/create.html",
                context: CreateFormContext {
                    form,
                    form_errors: vec![err.to_string()],
                },
            }
            .into_response())
        }
        Err(err) => Err(err),
    }
}

#[derive(Debug, Serialize)]
struct UploadFormContext {
    dataset: DatasetEntry,
    form_errors: Vec<String>,
}

async fn file_upload(
    RequireLogin(_user): RequireLogin,
    State(state): State<AppState>,
    Path((account, slug)): Path<(String, String)>,
    mut multipart: Multipart,
) -> Result<Response, ServiceError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::ValidationError {
            message: format!("Malformed multipart body: {}", e),
        })?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let content = field
                .bytes()
                .await
                .map_err(|e| ServiceError::ValidationError {
                    message: format!("Failed to read upload: {}", e),
                })?;
            upload = Some((filename, content.to_vec()));
            break;
        }
    }

    let (filename, content) = upload.ok_or_else(|| ServiceError::ValidationError {
        message: "Missing file field".to_string(),
    })?;

    match state
        .manager
        .upload_file(&account, &slug, &filename, &content)
        .await
    {
        Ok((dataset, _file)) => Ok(Redirect::to(&dataset.absolute_url()).into_response()),
        Err(ServiceError::DuplicateFile) => {
            // The form context always exposes the resolved dataset.
            let dataset = state.manager.resolve_dataset(&account, &slug).await?;
            Ok(Page {
                template: "dataset/upload.html",
                context: UploadFormContext {
                    dataset,
                    form_errors: vec![ServiceError::DuplicateFile.to_string()],
                },
            }
            .into_response())
        }
        Err(err) => Err(err),
    }
}

async fn panel_page(
    state: &AppState,
    account: &str,
    slug: &str,
    panel_name: PanelName,
) -> Result<Page<crate::catalog::DatasetPanel>, ServiceError> {
    let panel = state.manager.dataset_panel(account, slug, panel_name).await?;
    Ok(Page {
        template: panel_name.template(),
        context: panel,
    })
}

async fn dataset_detail(
    RequireLogin(_user): RequireLogin,
    State(state): State<AppState>,
    Path((account, slug)): Path<(String, String)>,
) -> Result<Page<crate::catalog::DatasetPanel>, ServiceError> {
    panel_page(&state, &account, &slug, PanelName::Files).await
}

async fn dataset_schema(
    RequireLogin(_user): RequireLogin,
    State(state): State<AppState>,
    Path((account, slug)): Path<(String, String)>,
) -> Result<Page<crate::catalog::DatasetPanel>, ServiceError> {
    panel_page(&state, &account, &slug, PanelName::Schema).await
}

async fn dataset_explore(
    RequireLogin(_user): RequireLogin,
    State(state): State<AppState>,
    Path((account, slug)): Path<(String, String)>,
) -> Result<Page<crate::catalog::DatasetPanel>, ServiceError> {
    panel_page(&state, &account, &slug, PanelName::Explore).await
}

async fn dataset_settings(
    RequireLogin(_user): RequireLogin,
    State(state): State<AppState>,
    Path((account, slug)): Path<(String, String)>,
) -> Result<Page<crate::catalog::DatasetPanel>, ServiceError> {
    panel_page(&state, &account, &slug, PanelName::Settings).await
}

async fn api_dataset_list(
    State(state): State<AppState>,
) -> Result<Json<Vec<DatasetEntry>>, ServiceError> {
    Ok(Json(state.manager.list_datasets().await?))
}

async fn api_dataset_get(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DatasetEntry>, ServiceError> {
    Ok(Json(state.manager.get_dataset(id).await?))
}

async fn api_dataset_create(
    State(state): State<AppState>,
    Json(fields): Json<NewDatasetFields>,
) -> Result<(StatusCode, Json<DatasetEntry>), ServiceError> {
    let dataset = state.manager.create_dataset_record(&fields).await?;
    Ok((StatusCode::CREATED, Json(dataset)))
}

#[derive(Debug, Deserialize)]
struct UpdateDatasetRequest {
    name: String,
    #[serde(default)]
    description: String,
}

async fn api_dataset_update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateDatasetRequest>,
) -> Result<Json<DatasetEntry>, ServiceError> {
    let dataset = state
        .manager
        .update_dataset(id, &request.name, &request.description)
        .await?;
    Ok(Json(dataset))
}

async fn api_dataset_delete(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ServiceError> {
    state.manager.delete_dataset(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn api_star_list(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<crate::catalog::StarEntry>>, ServiceError> {
    Ok(Json(state.manager.list_stars(user.id).await?))
}

#[derive(Debug, Deserialize)]
struct StarRequest {
    dataset_id: i32,
}

async fn api_star_create(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Json(request): Json<StarRequest>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    state
        .manager
        .star_dataset(user.id, request.dataset_id)
        .await?;
    Ok(Json(serde_json::json!({ "status": "starred status created" })))
}

async fn api_star_destroy(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Json(request): Json<StarRequest>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    state
        .manager
        .unstar_dataset(user.id, request.dataset_id)
        .await?;
    Ok(Json(serde_json::json!({ "status": "starred status deleted" })))
}
