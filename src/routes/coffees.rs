use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    middleware::auth::ApiKeyAuth,
    models::coffee::{CreateCoffeeRequest, PaginationQuery, UpdateCoffeeRequest},
    models::response::ResponsePayload,
    services::coffee::CoffeeService,
    AppState,
};

pub fn create_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("")
            .route(web::get().to(find_all))
            .route(web::post().to(create_coffee)),
    )
    .service(
        web::resource("/{id}")
            .route(web::get().to(find_one))
            .route(web::patch().to(update_coffee))
            .route(web::delete().to(remove_coffee)),
    )
    .service(web::resource("/{id}/recommend").route(web::post().to(recommend_coffee)))
    .service(web::resource("/{id}/recommendations").route(web::get().to(find_recommendations)));
}

/// GET / - List coffees with skip/take pagination (public)
async fn find_all(
    state: web::Data<AppState>,
    query: web::Query<PaginationQuery>,
) -> AppResult<HttpResponse> {
    query
        .validate()
        .map_err(|error| AppError::Validation(error.to_string()))?;

    let coffees = CoffeeService::new(&state.db).find_all(&query).await?;

    Ok(HttpResponse::Ok().json(ResponsePayload::succeeded(coffees)))
}

/// GET /{id} - Get one coffee (public)
async fn find_one(state: web::Data<AppState>, path: web::Path<String>) -> AppResult<HttpResponse> {
    let id = parse_id(&path.into_inner())?;

    let coffee = CoffeeService::new(&state.db).find_one(id).await?;

    Ok(HttpResponse::Ok().json(ResponsePayload::succeeded(coffee)))
}

/// POST / - Create a coffee with its flavors
async fn create_coffee(
    state: web::Data<AppState>,
    _auth: ApiKeyAuth,
    request: web::Json<CreateCoffeeRequest>,
) -> AppResult<HttpResponse> {
    let coffee = CoffeeService::new(&state.db).create(&request).await?;

    Ok(HttpResponse::Created().json(ResponsePayload::succeeded(coffee)))
}

/// PATCH /{id} - Partially update a coffee
async fn update_coffee(
    state: web::Data<AppState>,
    _auth: ApiKeyAuth,
    path: web::Path<String>,
    request: web::Json<UpdateCoffeeRequest>,
) -> AppResult<HttpResponse> {
    let id = parse_id(&path.into_inner())?;

    let coffee = CoffeeService::new(&state.db).update(id, &request).await?;

    Ok(HttpResponse::Ok().json(ResponsePayload::succeeded(coffee)))
}

/// DELETE /{id} - Remove a coffee; false when it was already absent
async fn remove_coffee(
    state: web::Data<AppState>,
    _auth: ApiKeyAuth,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = parse_id(&path.into_inner())?;

    let removed = CoffeeService::new(&state.db).remove(id).await?;

    Ok(HttpResponse::Ok().json(ResponsePayload::succeeded(removed)))
}

/// POST /{id}/recommend - Recommend a coffee; boolean outcome, never an error
async fn recommend_coffee(
    state: web::Data<AppState>,
    _auth: ApiKeyAuth,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = parse_id(&path.into_inner())?;

    let recommended = CoffeeService::new(&state.db).recommend(id).await;

    Ok(HttpResponse::Ok().json(ResponsePayload::succeeded(recommended)))
}

/// GET /{id}/recommendations - Events recorded for a coffee (public)
async fn find_recommendations(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = parse_id(&path.into_inner())?;

    let events = CoffeeService::new(&state.db).find_recommendations(id).await?;

    Ok(HttpResponse::Ok().json(ResponsePayload::succeeded(events)))
}

fn parse_id(value: &str) -> AppResult<i64> {
    match value.parse::<i64>() {
        Ok(id) => Ok(id),
        // Numeric but too large for any stored id: fold into the same
        // outcome as an absent row. i64::MAX is never a live id.
        Err(_) if is_numeric(value) => Ok(i64::MAX),
        Err(_) => Err(AppError::BadRequest(format!(
            "Wrong param \"id\": {}",
            value
        ))),
    }
}

fn is_numeric(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_ids() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert_eq!(parse_id("-3").unwrap(), -3);
    }

    #[test]
    fn oversized_numeric_ids_fold_to_an_unreachable_id() {
        assert_eq!(parse_id("99999999999999999999999").unwrap(), i64::MAX);
    }

    #[test]
    fn non_numeric_ids_are_a_client_error() {
        let error = parse_id("abc").unwrap_err();
        assert_eq!(error.to_string(), "Wrong param \"id\": abc");
    }
}
