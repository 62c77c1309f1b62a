use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::Config;
use crate::payload::{turnout_for, CandidatePayload, FieldErrors, FormPayload};
use crate::store::{
    CandidateRepository, FormRepository, SqliteStore, StoreError, TallyRepository,
};
use crate::tally::{aggregate_summary, validate_vote_consistency, SummaryReport};
use crate::types::{Candidate, FormDetails};

#[derive(Clone)]
struct ApiState {
    store: Arc<dyn TallyRepository>,
}

/// Body of every response, successful or not.
#[derive(Debug, Serialize)]
pub struct ApiEnvelope<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

#[derive(Debug)]
struct ApiReply<T: Serialize> {
    status: StatusCode,
    message: String,
    data: Option<T>,
}

impl<T: Serialize> IntoResponse for ApiReply<T> {
    fn into_response(self) -> Response {
        let body = Json(ApiEnvelope {
            success: true,
            message: self.message,
            data: self.data,
        });
        (self.status, body).into_response()
    }
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn method_not_allowed() -> Self {
        Self {
            status: StatusCode::METHOD_NOT_ALLOWED,
            message: "Method not allowed".to_string(),
        }
    }

    fn internal(error: impl std::fmt::Display) -> Self {
        warn!("request failed: {error}");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ApiEnvelope::<()> {
            success: false,
            message: self.message,
            data: None,
        });
        (self.status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<ApiReply<T>, ApiError>;

/// Which record an endpoint works on, for messages and error mapping.
#[derive(Debug, Clone, Copy)]
struct Resource {
    label: &'static str,
    title: &'static str,
}

const CANDIDATE: Resource = Resource {
    label: "candidate",
    title: "Candidate",
};

const FORM: Resource = Resource {
    label: "form",
    title: "Form",
};

impl Resource {
    fn does_not_exist(self) -> ApiError {
        ApiError::not_found(format!("{} does not exist", self.title))
    }

    fn not_found(self) -> ApiError {
        ApiError::not_found(format!("{} not found", self.title))
    }

    fn rejected(self, action: &str, errors: impl std::fmt::Display) -> ApiError {
        ApiError::bad_request(format!(
            "Could not {action} {} because of the following error: {errors}",
            self.label
        ))
    }

    fn store_error(self, action: &'static str) -> impl Fn(StoreError) -> ApiError {
        move |error| match error {
            StoreError::Duplicate { ref field, .. } => {
                self.rejected(action, FieldErrors::single(field.clone(), error.to_string()))
            }
            StoreError::NotFound { .. } => self.not_found(),
            other => ApiError::internal(other),
        }
    }
}

pub fn build_router(store: Arc<dyn TallyRepository>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/status/", get(status).fallback(method_not_allowed))
        .route(
            "/candidates",
            get(list_candidates)
                .post(create_candidate)
                .fallback(method_not_allowed),
        )
        .route(
            "/candidates/:id",
            get(get_candidate)
                .patch(update_candidate)
                .delete(delete_candidate)
                .fallback(method_not_allowed),
        )
        .route(
            "/forms",
            get(list_forms).post(create_form).fallback(method_not_allowed),
        )
        .route(
            "/forms/:id",
            get(get_form)
                .patch(update_form)
                .delete(delete_form)
                .fallback(method_not_allowed),
        )
        .route("/tallies", get(tallies).fallback(method_not_allowed))
        .fallback(unknown_route)
        .with_state(ApiState { store })
        .layer(cors)
}

pub async fn run_server(config: Config) -> Result<()> {
    let db_path = config.resolved_db_path();
    let store = SqliteStore::open(&db_path)?;
    info!("using tally database {}", db_path.display());

    let bind = config.bind_addr()?;
    let app = build_router(Arc::new(store));
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("REST API listening on http://{bind}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn status() -> ApiReply<()> {
    ok("Server is up", None)
}

async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

async fn unknown_route() -> ApiError {
    ApiError::not_found("Not found")
}

async fn list_candidates(State(state): State<ApiState>) -> ApiResult<Vec<Candidate>> {
    let candidates = state.store.list_candidates().map_err(ApiError::internal)?;
    Ok(ok("Candidates returned successfully", Some(candidates)))
}

async fn create_candidate(
    State(state): State<ApiState>,
    payload: std::result::Result<Json<CandidatePayload>, JsonRejection>,
) -> ApiResult<Candidate> {
    let new = decode(payload, CANDIDATE, "create")?
        .into_new()
        .map_err(|errors| CANDIDATE.rejected("create", errors))?;
    let created = state
        .store
        .insert_candidate(&new)
        .map_err(CANDIDATE.store_error("create"))?;
    info!("candidate {} added: {}", created.id, created.name);
    Ok(created_reply("Candidate added successfully", created))
}

async fn get_candidate(
    State(state): State<ApiState>,
    id: std::result::Result<Path<i64>, PathRejection>,
) -> ApiResult<Candidate> {
    let id = record_id(id, CANDIDATE.does_not_exist())?;
    let candidate = state
        .store
        .get_candidate(id)
        .map_err(ApiError::internal)?
        .ok_or_else(|| CANDIDATE.does_not_exist())?;
    Ok(ok("Candidate returned successfully", Some(candidate)))
}

async fn update_candidate(
    State(state): State<ApiState>,
    id: std::result::Result<Path<i64>, PathRejection>,
    payload: std::result::Result<Json<CandidatePayload>, JsonRejection>,
) -> ApiResult<Candidate> {
    let id = record_id(id, CANDIDATE.not_found())?;
    let mut candidate = state
        .store
        .get_candidate(id)
        .map_err(ApiError::internal)?
        .ok_or_else(|| CANDIDATE.not_found())?;
    let patch = decode(payload, CANDIDATE, "update")?
        .into_patch()
        .map_err(|errors| CANDIDATE.rejected("update", errors))?;

    if !patch.is_empty() {
        patch.apply(&mut candidate);
        candidate = state
            .store
            .update_candidate(&candidate)
            .map_err(CANDIDATE.store_error("update"))?;
    }
    Ok(ok("Candidate updated successfully", Some(candidate)))
}

async fn delete_candidate(
    State(state): State<ApiState>,
    id: std::result::Result<Path<i64>, PathRejection>,
) -> ApiResult<()> {
    let id = record_id(id, CANDIDATE.not_found())?;
    if !state.store.delete_candidate(id).map_err(ApiError::internal)? {
        return Err(CANDIDATE.not_found());
    }
    info!("candidate {id} deleted");
    Ok(ok("Candidate deleted successfully", None))
}

async fn list_forms(State(state): State<ApiState>) -> ApiResult<Vec<FormDetails>> {
    let forms = state.store.list_forms().map_err(ApiError::internal)?;
    Ok(ok("Forms returned successfully", Some(forms)))
}

async fn create_form(
    State(state): State<ApiState>,
    payload: std::result::Result<Json<FormPayload>, JsonRejection>,
) -> ApiResult<FormDetails> {
    let new = decode(payload, FORM, "create")?
        .into_new()
        .map_err(|errors| FORM.rejected("create", errors))?;
    let created = state
        .store
        .insert_form(&new)
        .map_err(FORM.store_error("create"))?;
    info!(
        "form {} added for {} (turnout {}%)",
        created.id, created.county, created.voter_turnout
    );
    Ok(created_reply("Form added successfully", created))
}

async fn get_form(
    State(state): State<ApiState>,
    id: std::result::Result<Path<i64>, PathRejection>,
) -> ApiResult<FormDetails> {
    let id = record_id(id, FORM.does_not_exist())?;
    let form = state
        .store
        .get_form(id)
        .map_err(ApiError::internal)?
        .ok_or_else(|| FORM.does_not_exist())?;
    Ok(ok("Form returned successfully", Some(form)))
}

async fn update_form(
    State(state): State<ApiState>,
    id: std::result::Result<Path<i64>, PathRejection>,
    payload: std::result::Result<Json<FormPayload>, JsonRejection>,
) -> ApiResult<FormDetails> {
    let id = record_id(id, FORM.not_found())?;
    let mut form = state
        .store
        .get_form(id)
        .map_err(ApiError::internal)?
        .ok_or_else(|| FORM.not_found())?;
    let patch = decode(payload, FORM, "update")?
        .into_patch()
        .map_err(|errors| FORM.rejected("update", errors))?;

    patch.apply(&mut form);
    let check =
        validate_vote_consistency(form.registered_voters, form.valid_votes, form.spoilt_votes);
    if !check.is_valid {
        return Err(ApiError::bad_request(check.message));
    }
    form.voter_turnout = turnout_for(form.registered_voters, form.valid_votes, form.spoilt_votes)
        .map_err(|message| {
            FORM.rejected("update", FieldErrors::single("registered_voters", message))
        })?;

    let saved = state
        .store
        .update_form(&form)
        .map_err(FORM.store_error("update"))?;
    info!("form {} updated for {}", saved.id, saved.county);
    Ok(ok("Form updated successfully", Some(saved)))
}

async fn delete_form(
    State(state): State<ApiState>,
    id: std::result::Result<Path<i64>, PathRejection>,
) -> ApiResult<()> {
    let id = record_id(id, FORM.not_found())?;
    if !state.store.delete_form(id).map_err(ApiError::internal)? {
        return Err(FORM.not_found());
    }
    info!("form {id} deleted");
    Ok(ok("Form deleted successfully", None))
}

async fn tallies(State(state): State<ApiState>) -> ApiResult<SummaryReport> {
    let forms = state.store.list_forms().map_err(ApiError::internal)?;
    match aggregate_summary(&forms) {
        Some(report) => Ok(ok("Forms returned successfully", Some(report))),
        None => Ok(ok("No forms have been submitted yet", None)),
    }
}

fn ok<T: Serialize>(message: &str, data: Option<T>) -> ApiReply<T> {
    ApiReply {
        status: StatusCode::OK,
        message: message.to_string(),
        data,
    }
}

fn created_reply<T: Serialize>(message: &str, data: T) -> ApiReply<T> {
    ApiReply {
        status: StatusCode::CREATED,
        message: message.to_string(),
        data: Some(data),
    }
}

/// Non-numeric ids can never match a row.
fn record_id(
    id: std::result::Result<Path<i64>, PathRejection>,
    missing: ApiError,
) -> std::result::Result<i64, ApiError> {
    id.map(|Path(id)| id).map_err(|_| missing)
}

fn decode<T>(
    payload: std::result::Result<Json<T>, JsonRejection>,
    resource: Resource,
    action: &str,
) -> std::result::Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| {
            resource.rejected(action, FieldErrors::single("body", rejection.body_text()))
        })
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        let store = SqliteStore::open_in_memory().expect("in-memory store");
        build_router(Arc::new(store))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                request = request.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(request.body(body).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = serde_json::from_slice(&bytes).expect("json envelope");
        (status, value)
    }

    fn nairobi() -> Value {
        json!({
            "county": "Nairobi",
            "registered_voters": "1,000",
            "valid_votes": "600",
            "spoilt_votes": "50",
            "odinga": "300",
            "ruto": "250",
            "wajackoyah": "40",
            "mweure": "10"
        })
    }

    #[tokio::test]
    async fn status_reports_up() {
        let app = app();
        let (code, body) = send(&app, "GET", "/status/", None).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "success": true, "message": "Server is up", "data": null })
        );
    }

    #[tokio::test]
    async fn unsupported_verbs_get_405_envelope() {
        let app = app();
        for (method, uri) in [
            ("POST", "/status/"),
            ("PUT", "/candidates"),
            ("POST", "/forms/1"),
            ("DELETE", "/tallies"),
        ] {
            let (code, body) = send(&app, method, uri, None).await;
            assert_eq!(code, StatusCode::METHOD_NOT_ALLOWED, "{method} {uri}");
            assert_eq!(body["success"], false);
            assert_eq!(body["message"], "Method not allowed");
        }
    }

    #[tokio::test]
    async fn missing_candidate_is_404() {
        let app = app();
        let (code, body) = send(&app, "GET", "/candidates/42", None).await;
        assert_eq!(code, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Candidate does not exist");
        assert!(body["data"].is_null());

        let (code, _) = send(&app, "GET", "/candidates/abc", None).await;
        assert_eq!(code, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn candidate_lifecycle() {
        let app = app();
        let (code, body) = send(
            &app,
            "POST",
            "/candidates",
            Some(json!({ "name": "William Ruto", "keyword": "ruto", "party": "UDA" })),
        )
        .await;
        assert_eq!(code, StatusCode::CREATED);
        assert_eq!(body["message"], "Candidate added successfully");
        let id = body["data"]["id"].as_i64().expect("id");
        assert!(body["data"]["votes"].is_null());

        let (code, body) = send(
            &app,
            "PATCH",
            &format!("/candidates/{id}"),
            Some(json!({ "votes": "7,176,141" })),
        )
        .await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["data"]["votes"], 7_176_141);
        assert_eq!(body["data"]["party"], "UDA");

        let (_, body) = send(&app, "GET", "/candidates", None).await;
        assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

        let (code, _) = send(&app, "DELETE", &format!("/candidates/{id}"), None).await;
        assert_eq!(code, StatusCode::OK);
        let (code, body) = send(&app, "PATCH", &format!("/candidates/{id}"), Some(json!({}))).await;
        assert_eq!(code, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Candidate not found");
    }

    #[tokio::test]
    async fn duplicate_candidate_is_rejected() {
        let app = app();
        let candidate = json!({ "name": "Raila Odinga", "keyword": "odinga", "party": "Azimio" });
        let (code, _) = send(&app, "POST", "/candidates", Some(candidate.clone())).await;
        assert_eq!(code, StatusCode::CREATED);

        let (code, body) = send(&app, "POST", "/candidates", Some(candidate)).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            "Could not create candidate because of the following error: \
             name: candidate with this name already exists."
        );
    }

    #[tokio::test]
    async fn form_create_computes_turnout() {
        let app = app();
        let (code, body) = send(&app, "POST", "/forms", Some(nairobi())).await;
        assert_eq!(code, StatusCode::CREATED);
        assert_eq!(body["message"], "Form added successfully");
        assert_eq!(body["data"]["registered_voters"], 1000);
        assert_eq!(body["data"]["voter_turnout"], 65.0);

        let (code, body) = send(&app, "POST", "/forms", Some(json!({ "county": "Meru" }))).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        let message = body["message"].as_str().expect("message");
        assert!(message.starts_with("Could not create form because of the following error:"));
        assert!(message.contains("registered_voters: This field is required."));
    }

    #[tokio::test]
    async fn form_patch_enforces_vote_consistency() {
        let app = app();
        let (_, body) = send(&app, "POST", "/forms", Some(nairobi())).await;
        let id = body["data"]["id"].as_i64().expect("id");
        let uri = format!("/forms/{id}");

        let (code, body) = send(&app, "PATCH", &uri, Some(json!({ "spoilt_votes": "500" }))).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Total votes cannot be more than registered voters");

        let (code, body) = send(
            &app,
            "PATCH",
            &uri,
            Some(json!({ "valid_votes": 100, "spoilt_votes": 150 })),
        )
        .await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Spoilt votes cannot be more than valid votes");

        let (_, body) = send(&app, "GET", &uri, None).await;
        assert_eq!(body["data"]["spoilt_votes"], 50);

        let (code, body) = send(&app, "PATCH", &uri, Some(json!({ "valid_votes": "700" }))).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["message"], "Form updated successfully");
        assert_eq!(body["data"]["voter_turnout"], 75.0);
    }

    #[tokio::test]
    async fn zero_register_is_rejected_on_create_and_patch() {
        let app = app();
        let (code, body) = send(
            &app,
            "POST",
            "/forms",
            Some(json!({
                "county": "Lamu",
                "registered_voters": 0,
                "valid_votes": 0,
                "spoilt_votes": 0
            })),
        )
        .await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            "Could not create form because of the following error: \
             registered_voters: Registered voters must be greater than zero."
        );

        let (_, body) = send(&app, "POST", "/forms", Some(nairobi())).await;
        let uri = format!("/forms/{}", body["data"]["id"]);
        let (code, body) = send(
            &app,
            "PATCH",
            &uri,
            Some(json!({ "registered_voters": 0, "valid_votes": 0, "spoilt_votes": 0 })),
        )
        .await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(
            body["message"],
            "Could not update form because of the following error: \
             registered_voters: Registered voters must be greater than zero."
        );

        let (_, body) = send(&app, "GET", &uri, None).await;
        assert_eq!(body["data"]["registered_voters"], 1000);
        assert_eq!(body["data"]["valid_votes"], 600);
        assert_eq!(body["data"]["voter_turnout"], 65.0);
    }

    #[tokio::test]
    async fn oversized_counts_never_reach_the_summary() {
        let app = app();
        let oversized = json!({
            "county": "Turkana",
            "registered_voters": "9,223,372,036,854,775,807",
            "valid_votes": "5,000,000,000,000,000,000",
            "spoilt_votes": "0",
            "odinga": "5,000,000,000,000,000,000"
        });
        let (code, body) = send(&app, "POST", "/forms", Some(oversized)).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        let message = body["message"].as_str().expect("message");
        assert!(message.contains(
            "registered_voters: Ensure this value is less than or equal to 2147483647."
        ));

        send(&app, "POST", "/forms", Some(nairobi())).await;
        let (code, body) = send(&app, "GET", "/tallies", None).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["data"]["total_counties"], 1);
    }

    #[tokio::test]
    async fn candidate_share_and_nullable_votes() {
        let app = app();
        let (code, body) = send(
            &app,
            "POST",
            "/candidates",
            Some(json!({
                "name": "Raila Odinga",
                "keyword": "odinga",
                "party": "Azimio",
                "votes": "6,942,930",
                "votes_percentage": "48.85"
            })),
        )
        .await;
        assert_eq!(code, StatusCode::CREATED);
        assert_eq!(body["data"]["votes_percentage"], 48.85);
        let uri = format!("/candidates/{}", body["data"]["id"]);

        let (code, body) = send(&app, "PATCH", &uri, Some(json!({ "votes": null }))).await;
        assert_eq!(code, StatusCode::OK);
        assert!(body["data"]["votes"].is_null());
        assert_eq!(body["data"]["votes_percentage"], 48.85);

        let (code, body) =
            send(&app, "PATCH", &uri, Some(json!({ "votes_percentage": "n/a" }))).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            "Could not update candidate because of the following error: \
             votes_percentage: A valid number is required."
        );
    }

    #[tokio::test]
    async fn deleting_form_twice() {
        let app = app();
        let (_, body) = send(&app, "POST", "/forms", Some(nairobi())).await;
        let uri = format!("/forms/{}", body["data"]["id"]);

        let (code, body) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["message"], "Form deleted successfully");

        let (code, body) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(code, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Form not found");
    }

    #[tokio::test]
    async fn tallies_summarise_all_counties() {
        let app = app();
        let (code, body) = send(&app, "GET", "/tallies", None).await;
        assert_eq!(code, StatusCode::OK);
        assert!(body["data"].is_null());

        send(&app, "POST", "/forms", Some(nairobi())).await;
        send(
            &app,
            "POST",
            "/forms",
            Some(json!({
                "county": "Kiambu",
                "registered_voters": "2,000",
                "valid_votes": "1,400",
                "spoilt_votes": "100",
                "odinga": "700",
                "ruto": "700"
            })),
        )
        .await;

        let (code, body) = send(&app, "GET", "/tallies", None).await;
        assert_eq!(code, StatusCode::OK);
        let data = &body["data"];
        assert_eq!(data["total_counties"], 2);
        assert_eq!(data["total_registered_voters"], "3,000");
        assert_eq!(data["total_valid_votes"]["value"], "2,000");
        assert_eq!(data["raila_odinga"]["total"], "1,000");
        assert_eq!(data["raila_odinga"]["percentage"], "50.0%");
    }

    #[tokio::test]
    async fn malformed_body_is_a_validation_error() {
        let app = app();
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/forms")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_path_is_404_envelope() {
        let app = app();
        let (code, body) = send(&app, "GET", "/nowhere", None).await;
        assert_eq!(code, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }
}
