use actix_web::{web, HttpResponse};

use super::AppState;
use crate::auth::Auth;
use crate::error::ApiError;
use crate::ledger;
use crate::models::RedeemForm;
use crate::telemetry;

#[utoipa::path(
    get,
    path = "/api/v1/catalog",
    tag = "ledger",
    responses((status = 200, description = "Vouchers available for points", body = [CatalogItem]))
)]
pub async fn list_catalog() -> HttpResponse {
    HttpResponse::Ok().json(ledger::catalog())
}

#[utoipa::path(
    post,
    path = "/api/v1/redemptions",
    tag = "ledger",
    request_body = RedeemForm,
    responses(
        (status = 201, description = "Voucher claimed; balance after deduction", body = Redemption),
        (status = 400, description = "Full name and class are required"),
        (status = 404, description = "Unknown item"),
        (status = 409, description = "Insufficient points")
    )
)]
pub async fn redeem(auth: Auth, data: web::Data<AppState>, payload: web::Json<RedeemForm>) -> Result<HttpResponse, ApiError> {
    let form = payload.into_inner();
    ledger::validate_form(&form)?;
    let item = ledger::find_item(&form.item_id).ok_or(ApiError::NotFound)?;
    let redemption = data.repo.redeem(&auth.0.sub, &item, &form).await?;
    telemetry::redemption(&item.name);
    tracing::info!(user = %auth.0.sub, item = %item.name, balance = redemption.balance, "voucher redeemed");
    Ok(HttpResponse::Created().json(redemption))
}

#[utoipa::path(
    get,
    path = "/api/v1/history/redemptions",
    tag = "history",
    responses((status = 200, description = "Caller's redemptions, newest first", body = [RedeemRecord]))
)]
pub async fn my_redemptions(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.repo.redemptions_for(&auth.0.sub).await?))
}
