use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::booking::Booking;
use crate::error::AppResult;
use crate::extractors::{Body, Id, Params, SharerId};
use crate::ids::BookingId;
use crate::state::AppState;
use crate::validation::{ApprovalParams, BookingBody, StateParams};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/bookings", get(list_for_booker).post(create_booking))
        .route("/bookings/owner", get(list_for_owner))
        .route("/bookings/{id}", get(get_booking).patch(approve_booking))
}

async fn create_booking(
    State(state): State<AppState>,
    SharerId(booker): SharerId,
    Body(body): Body<BookingBody>,
) -> AppResult<Json<Booking>> {
    tracing::info!(user_id = %booker, "Create booking");
    let booking = state.bookings.create(booker, body.validate()?).await?;
    Ok(Json(booking))
}

async fn approve_booking(
    State(state): State<AppState>,
    SharerId(owner): SharerId,
    Id(id): Id,
    Params(params): Params<ApprovalParams>,
) -> AppResult<Json<Booking>> {
    tracing::info!(user_id = %owner, booking_id = id, approved = ?params.approved, "Decide booking");
    let booking = state
        .bookings
        .approve(owner, BookingId(id), params.approved()?)
        .await?;
    Ok(Json(booking))
}

async fn get_booking(
    State(state): State<AppState>,
    SharerId(user): SharerId,
    Id(id): Id,
) -> AppResult<Json<Booking>> {
    tracing::info!(user_id = %user, booking_id = id, "Get booking");
    Ok(Json(state.bookings.read(BookingId(id), user).await?))
}

async fn list_for_booker(
    State(state): State<AppState>,
    SharerId(booker): SharerId,
    Params(params): Params<StateParams>,
) -> AppResult<Json<Vec<Booking>>> {
    tracing::info!(user_id = %booker, state = params.state_text(), "List bookings as booker");
    let bookings = state
        .bookings
        .list_for_booker(params.page()?, booker, params.state_text())
        .await?;
    Ok(Json(bookings))
}

async fn list_for_owner(
    State(state): State<AppState>,
    SharerId(owner): SharerId,
    Params(params): Params<StateParams>,
) -> AppResult<Json<Vec<Booking>>> {
    tracing::info!(user_id = %owner, state = params.state_text(), "List bookings as owner");
    let bookings = state
        .bookings
        .list_for_owner(params.page()?, owner, params.state_text())
        .await?;
    Ok(Json(bookings))
}
