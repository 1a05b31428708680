// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # HTTP Server
//!
//! Warp filters for every endpoint. Path and method are matched before the
//! bearer token is checked, so an unauthenticated request to a real endpoint
//! gets 401 while an unknown path still gets 404.

use crate::auth::{AuthManager, AuthenticatedCaller};
use crate::config::ServerConfig;
use crate::database::Database;
use crate::errors::ApiError;
use crate::health::{HealthChecker, HealthStatus};
use crate::logging::AppLogger;
use crate::models::ActivityInput;
use crate::routes::{
    self, ActivityListQuery, ActivityPatch, ActivityRoutes, AuthRoutes, LoginRequest, MetricsQuery,
    MetricsRoutes, NotificationInput, NotificationListQuery, NotificationPatch, NotificationRoutes,
    RefreshRequest, RegisterRequest, UpdateUserRequest, UserRoutes,
};
use anyhow::Result;
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

/// Shared state handed to every endpoint
#[derive(Clone)]
pub struct ApiContext {
    database: Database,
    auth_manager: AuthManager,
    pub auth: AuthRoutes,
    pub users: UserRoutes,
    pub activities: ActivityRoutes,
    pub notifications: NotificationRoutes,
    pub metrics: MetricsRoutes,
    pub health: Arc<HealthChecker>,
}

impl ApiContext {
    pub fn new(database: Database, auth_manager: AuthManager, bcrypt_cost: u32) -> Self {
        Self {
            auth: AuthRoutes::new(database.clone(), auth_manager.clone(), bcrypt_cost),
            users: UserRoutes::new(database.clone()),
            activities: ActivityRoutes::new(database.clone()),
            notifications: NotificationRoutes::new(database.clone()),
            metrics: MetricsRoutes::new(database.clone()),
            health: Arc::new(HealthChecker::new(database.clone())),
            database,
            auth_manager,
        }
    }
}

/// All endpoints with rejection handling, without CORS or request logging
pub fn api_routes(context: ApiContext) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    endpoints(context).recover(handle_rejection)
}

/// Bind and serve until the process is stopped
pub async fn run(context: ApiContext, config: &ServerConfig) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.http_host, config.http_port).parse()?;

    let request_log = warp::log::custom(|info| {
        AppLogger::log_api_request(
            info.method().as_str(),
            info.path(),
            info.status().as_u16(),
            info.elapsed().as_millis() as u64,
        );
    });

    let routes = endpoints(context)
        .with(cors(&config.cors_origins))
        .recover(handle_rejection)
        .with(request_log);

    info!("Fitness tracker API listening on http://{}", addr);
    warp::serve(routes).run(addr).await;

    Ok(())
}

fn cors(origins: &[String]) -> warp::cors::Builder {
    let cors = warp::cors()
        .allow_headers(vec!["content-type", "authorization"])
        .allow_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"]);

    if origins.iter().any(|origin| origin == "*") {
        cors.allow_any_origin()
    } else {
        cors.allow_origins(origins.iter().map(String::as_str))
    }
}

fn endpoints(context: ApiContext) -> BoxedFilter<(Response,)> {
    let home = warp::path!("home")
        .and(warp::get())
        .map(|| warp::reply::json(&routes::home()).into_response());

    let health = warp::path!("health")
        .and(warp::get())
        .and(with_context(context.clone()))
        .then(|ctx: ApiContext| async move {
            let response = ctx.health.check().await;
            let status = match response.status {
                HealthStatus::Healthy => StatusCode::OK,
                HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
            };
            warp::reply::with_status(warp::reply::json(&response), status).into_response()
        });

    home.or(health)
        .unify()
        .or(auth_endpoints(context.clone()))
        .unify()
        .or(activity_endpoints(context.clone()))
        .unify()
        .or(notification_endpoints(context.clone()))
        .unify()
        .or(metrics_endpoints(context))
        .unify()
        .boxed()
}

fn auth_endpoints(context: ApiContext) -> BoxedFilter<(Response,)> {
    let register = warp::path!("users")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_context(context.clone()))
        .then(|request: RegisterRequest, ctx: ApiContext| async move {
            respond(ctx.auth.register(request).await, StatusCode::CREATED)
        });

    let login = warp::path!("login")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_context(context.clone()))
        .then(|request: LoginRequest, ctx: ApiContext| async move {
            respond(ctx.auth.login(request).await, StatusCode::OK)
        });

    let refresh = warp::path!("token" / "refresh")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_context(context.clone()))
        .then(|request: RefreshRequest, ctx: ApiContext| async move {
            respond(ctx.auth.refresh(request).await, StatusCode::OK)
        });

    let me = warp::path!("users" / "me")
        .and(warp::get())
        .and(with_auth(context.clone()))
        .then(|caller: AuthenticatedCaller, ctx: ApiContext| async move {
            respond(ctx.users.me(&caller).await, StatusCode::OK)
        });

    let update_me = warp::path!("users" / "me")
        .and(warp::patch())
        .and(with_auth(context.clone()))
        .and(warp::body::json())
        .then(
            |caller: AuthenticatedCaller, ctx: ApiContext, request: UpdateUserRequest| async move {
                respond(ctx.users.update_me(&caller, request).await, StatusCode::OK)
            },
        );

    let delete_me = warp::path!("users" / "me")
        .and(warp::delete())
        .and(with_auth(context))
        .then(|caller: AuthenticatedCaller, ctx: ApiContext| async move {
            no_content(ctx.users.delete_me(&caller).await)
        });

    register
        .or(login)
        .unify()
        .or(refresh)
        .unify()
        .or(me)
        .unify()
        .or(update_me)
        .unify()
        .or(delete_me)
        .unify()
        .boxed()
}

fn activity_endpoints(context: ApiContext) -> BoxedFilter<(Response,)> {
    let list = warp::path!("activities")
        .and(warp::get())
        .and(with_auth(context.clone()))
        .and(warp::query::<ActivityListQuery>())
        .then(
            |caller: AuthenticatedCaller, ctx: ApiContext, query: ActivityListQuery| async move {
                respond(ctx.activities.list(&caller, query).await, StatusCode::OK)
            },
        );

    let create = warp::path!("activities")
        .and(warp::post())
        .and(with_auth(context.clone()))
        .and(warp::body::json())
        .then(
            |caller: AuthenticatedCaller, ctx: ApiContext, input: ActivityInput| async move {
                respond(ctx.activities.create(&caller, input).await, StatusCode::CREATED)
            },
        );

    let get = warp::path!("activities" / Uuid)
        .and(warp::get())
        .and(with_auth(context.clone()))
        .then(|id: Uuid, caller: AuthenticatedCaller, ctx: ApiContext| async move {
            respond(ctx.activities.get(&caller, id).await, StatusCode::OK)
        });

    let replace = warp::path!("activities" / Uuid)
        .and(warp::put())
        .and(with_auth(context.clone()))
        .and(warp::body::json())
        .then(
            |id: Uuid, caller: AuthenticatedCaller, ctx: ApiContext, input: ActivityInput| async move {
                respond(ctx.activities.replace(&caller, id, input).await, StatusCode::OK)
            },
        );

    let patch = warp::path!("activities" / Uuid)
        .and(warp::patch())
        .and(with_auth(context.clone()))
        .and(warp::body::json())
        .then(
            |id: Uuid, caller: AuthenticatedCaller, ctx: ApiContext, patch: ActivityPatch| async move {
                respond(ctx.activities.patch(&caller, id, patch).await, StatusCode::OK)
            },
        );

    let delete = warp::path!("activities" / Uuid)
        .and(warp::delete())
        .and(with_auth(context))
        .then(|id: Uuid, caller: AuthenticatedCaller, ctx: ApiContext| async move {
            no_content(ctx.activities.delete(&caller, id).await)
        });

    list.or(create)
        .unify()
        .or(get)
        .unify()
        .or(replace)
        .unify()
        .or(patch)
        .unify()
        .or(delete)
        .unify()
        .boxed()
}

fn notification_endpoints(context: ApiContext) -> BoxedFilter<(Response,)> {
    let list = warp::path!("notifications")
        .and(warp::get())
        .and(with_auth(context.clone()))
        .and(warp::query::<NotificationListQuery>())
        .then(
            |caller: AuthenticatedCaller, ctx: ApiContext, query: NotificationListQuery| async move {
                respond(ctx.notifications.list(&caller, query).await, StatusCode::OK)
            },
        );

    let create = warp::path!("notifications")
        .and(warp::post())
        .and(with_auth(context.clone()))
        .and(warp::body::json())
        .then(
            |caller: AuthenticatedCaller, ctx: ApiContext, input: NotificationInput| async move {
                respond(ctx.notifications.create(&caller, input).await, StatusCode::CREATED)
            },
        );

    let mark_all_read = warp::path!("notifications" / "read-all")
        .and(warp::post())
        .and(with_auth(context.clone()))
        .then(|caller: AuthenticatedCaller, ctx: ApiContext| async move {
            respond(ctx.notifications.mark_all_read(&caller).await, StatusCode::OK)
        });

    let get = warp::path!("notifications" / Uuid)
        .and(warp::get())
        .and(with_auth(context.clone()))
        .then(|id: Uuid, caller: AuthenticatedCaller, ctx: ApiContext| async move {
            respond(ctx.notifications.get(&caller, id).await, StatusCode::OK)
        });

    let update = warp::path!("notifications" / Uuid)
        .and(warp::put().or(warp::patch()).unify())
        .and(with_auth(context.clone()))
        .and(warp::body::json())
        .then(
            |id: Uuid, caller: AuthenticatedCaller, ctx: ApiContext, patch: NotificationPatch| async move {
                respond(ctx.notifications.update(&caller, id, patch).await, StatusCode::OK)
            },
        );

    let delete = warp::path!("notifications" / Uuid)
        .and(warp::delete())
        .and(with_auth(context))
        .then(|id: Uuid, caller: AuthenticatedCaller, ctx: ApiContext| async move {
            no_content(ctx.notifications.delete(&caller, id).await)
        });

    list.or(create)
        .unify()
        .or(mark_all_read)
        .unify()
        .or(get)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .boxed()
}

fn metrics_endpoints(context: ApiContext) -> BoxedFilter<(Response,)> {
    warp::path!("activity-metrics")
        .and(warp::get())
        .and(with_auth(context))
        .and(warp::query::<MetricsQuery>())
        .then(
            |caller: AuthenticatedCaller, ctx: ApiContext, query: MetricsQuery| async move {
                respond(ctx.metrics.activity_metrics(&caller, query).await, StatusCode::OK)
            },
        )
        .boxed()
}

fn with_context(context: ApiContext) -> impl Filter<Extract = (ApiContext,), Error = Infallible> + Clone {
    warp::any().map(move || context.clone())
}

/// Resolve the caller from the bearer token and hand it on with the context
fn with_auth(
    context: ApiContext,
) -> impl Filter<Extract = (AuthenticatedCaller, ApiContext), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_context(context))
        .and_then(authenticate)
        .untuple_one()
}

async fn authenticate(
    header: Option<String>,
    context: ApiContext,
) -> Result<(AuthenticatedCaller, ApiContext), Rejection> {
    let caller = context
        .auth_manager
        .authenticate_header(header.as_deref())
        .map_err(warp::reject::custom)?;

    // Tokens outlive deleted accounts
    match context.database.get_user(caller.user_id).await {
        Ok(Some(_)) => Ok((caller, context)),
        Ok(None) => {
            AppLogger::log_security_event(
                "token_for_deleted_user",
                "valid token presented for a user that no longer exists",
                Some(&caller.user_id.to_string()),
            );
            Err(warp::reject::custom(ApiError::Unauthenticated))
        }
        Err(e) => Err(warp::reject::custom(ApiError::Internal(e))),
    }
}

fn respond<T: Serialize>(result: Result<T, ApiError>, status: StatusCode) -> Response {
    match result {
        Ok(body) => warp::reply::with_status(warp::reply::json(&body), status).into_response(),
        Err(e) => e.into_response(),
    }
}

fn no_content(result: Result<(), ApiError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Turn rejections into JSON error responses
pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if let Some(api_error) = err.find::<ApiError>() {
        return Ok(api_error.to_response());
    }

    let (status, message) = if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid query string".to_string())
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, "Expected a JSON body".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found.".to_string())
    } else {
        error!("Unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
    };

    Ok(warp::reply::with_status(warp::reply::json(&json!({ "error": message })), status).into_response())
}
