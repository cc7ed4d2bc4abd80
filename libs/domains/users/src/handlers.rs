use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use axum_helpers::errors::responses::{
    InternalServerErrorResponse, NotFoundResponse, ValidationErrorResponse,
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::{UserError, UserResult};
use crate::models::{ListParams, StatusResponse, User, UserPage, UserPayload, PAGE_SIZE};
use crate::repository::UserRepository;
use crate::service::UserService;

/// OpenAPI documentation for the Users API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_users,
        create_user,
        get_user,
        update_user,
        patch_user,
        delete_user,
        active_users,
        activate_user,
        deactivate_user,
    ),
    components(
        schemas(User, UserPayload, UserPage, StatusResponse),
        responses(NotFoundResponse, ValidationErrorResponse, InternalServerErrorResponse)
    ),
    tags(
        (name = "users", description = "User management endpoints")
    )
)]
pub struct ApiDoc;

/// Create the users router with all HTTP endpoints.
///
/// Paths carry a trailing slash, matching the public API surface
/// (`/api/users/`, `/api/users/{id}/`, ...).
pub fn router<R: UserRepository + 'static>(service: UserService<R>) -> Router {
    let shared_service = Arc::new(service);

    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/active_users/", get(active_users))
        .route(
            "/{id}/",
            get(get_user)
                .put(update_user)
                .patch(patch_user)
                .delete(delete_user),
        )
        .route("/{id}/activate/", post(activate_user))
        .route("/{id}/deactivate/", post(deactivate_user))
        .with_state(shared_service)
}

/// Build a page link, preserving the other query params.
///
/// The link back to the first page omits the page param entirely, the way
/// the original API's paginator renders it.
fn page_link(path: &str, params: &ListParams, page: u64) -> String {
    let mut query: Vec<String> = Vec::new();

    if let Some(ref search) = params.search {
        query.push(format!("search={}", urlencoding::encode(search)));
    }
    if let Some(ref is_active) = params.is_active {
        query.push(format!("is_active={}", urlencoding::encode(is_active)));
    }
    if page > 1 {
        query.push(format!("page={}", page));
    }

    if query.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, query.join("&"))
    }
}

/// List users, paginated and optionally filtered
#[utoipa::path(
    get,
    path = "/",
    tag = "users",
    params(ListParams),
    responses(
        (status = 200, description = "One page of users", body = UserPage),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_users<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<ListParams>,
) -> UserResult<Json<UserPage>> {
    let page = match params.page.as_deref() {
        None => 1,
        Some(raw) => raw.parse::<u64>().map_err(|_| UserError::InvalidPage)?,
    };

    let (results, count) = service
        .list_users(params.search.clone(), params.is_active_filter(), page)
        .await?;

    let path = uri.path();
    let last_page = count.div_ceil(PAGE_SIZE).max(1);
    let next = (page < last_page).then(|| page_link(path, &params, page + 1));
    let previous = (page > 1).then(|| page_link(path, &params, page - 1));

    Ok(Json(UserPage {
        count,
        next,
        previous,
        results,
    }))
}

/// Create a new user
#[utoipa::path(
    post,
    path = "/",
    tag = "users",
    request_body = UserPayload,
    responses(
        (status = 201, description = "User created successfully", body = User),
        (status = 400, response = ValidationErrorResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    Json(payload): Json<UserPayload>,
) -> UserResult<impl IntoResponse> {
    let user = service.create_user(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Get a user by ID
#[utoipa::path(
    get,
    path = "/{id}/",
    tag = "users",
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    Path(id): Path<i64>,
) -> UserResult<Json<User>> {
    let user = service.get_user(id).await?;
    Ok(Json(user))
}

/// Replace a user (full update, every field required)
#[utoipa::path(
    put,
    path = "/{id}/",
    tag = "users",
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    request_body = UserPayload,
    responses(
        (status = 200, description = "User updated successfully", body = User),
        (status = 400, response = ValidationErrorResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    Path(id): Path<i64>,
    Json(payload): Json<UserPayload>,
) -> UserResult<Json<User>> {
    let user = service.update_user(id, payload, false).await?;
    Ok(Json(user))
}

/// Update a user (partial update, only supplied fields change)
#[utoipa::path(
    patch,
    path = "/{id}/",
    tag = "users",
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    request_body = UserPayload,
    responses(
        (status = 200, description = "User updated successfully", body = User),
        (status = 400, response = ValidationErrorResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn patch_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    Path(id): Path<i64>,
    Json(payload): Json<UserPayload>,
) -> UserResult<Json<User>> {
    let user = service.update_user(id, payload, true).await?;
    Ok(Json(user))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/{id}/",
    tag = "users",
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted successfully"),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    Path(id): Path<i64>,
) -> UserResult<impl IntoResponse> {
    service.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List all active users, unpaginated
#[utoipa::path(
    get,
    path = "/active_users/",
    tag = "users",
    responses(
        (status = 200, description = "Active users", body = Vec<User>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn active_users<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
) -> UserResult<Json<Vec<User>>> {
    let users = service.list_active_users().await?;
    Ok(Json(users))
}

/// Activate a user
#[utoipa::path(
    post,
    path = "/{id}/activate/",
    tag = "users",
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User activated", body = StatusResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn activate_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    Path(id): Path<i64>,
) -> UserResult<Json<StatusResponse>> {
    let user = service.set_active(id, true).await?;
    Ok(Json(StatusResponse {
        status: "User activated successfully".to_string(),
        user,
    }))
}

/// Deactivate a user
#[utoipa::path(
    post,
    path = "/{id}/deactivate/",
    tag = "users",
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User deactivated", body = StatusResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn deactivate_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    Path(id): Path<i64>,
) -> UserResult<Json<StatusResponse>> {
    let user = service.set_active(id, false).await?;
    Ok(Json(StatusResponse {
        status: "User deactivated successfully".to_string(),
        user,
    }))
}
