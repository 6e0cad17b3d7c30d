//! Shelter, donor and donation-stats endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use haven_chain::{DonationStats, donation_stats};
use haven_core::{Donor, NewShelter, Shelter, ShelterSummary};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::AppState;
use crate::error::{ApiError, ApiResult};

const SHELTER_FIELDS: [&str; 5] = ["name", "location", "operational_costs", "metrics", "animals"];
const METRICS_FIELDS: [&str; 4] = [
    "current_animals",
    "monthly_intake",
    "neutering_count",
    "adoption_rate",
];
const DONOR_FIELDS: [&str; 4] = ["name", "amount", "recurring", "duration_months"];

fn require_fields(body: &Value, fields: &[&str], what: &str) -> ApiResult<()> {
    match fields.iter().find(|f| body.get(**f).is_none()) {
        Some(field) => Err(ApiError::bad_request(format!("Missing required {what}: {field}"))),
        None => Ok(()),
    }
}

fn parse_shelter(body: Value) -> ApiResult<NewShelter> {
    let shelter: NewShelter = serde_json::from_value(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid shelter: {e}")))?;
    for (field, value) in [("name", &shelter.name), ("location", &shelter.location)] {
        if value.trim().is_empty() {
            return Err(ApiError::bad_request(format!("Invalid value for field: {field}")));
        }
    }
    Ok(shelter)
}

/// Store a shelter and, once agents are running, give it an agent straight away.
async fn store_shelter(state: &AppState, new: NewShelter) -> haven_core::Result<Shelter> {
    let ctx = state.manager.context();
    let shelter = ctx.store.insert_shelter(new)?;
    info!(shelter_id = %shelter.id, name = %shelter.name, "shelter created");
    if state.manager.is_initialized()
        && let Err(e) = state.manager.initialize_shelter_agent(&shelter).await
    {
        warn!(shelter_id = %shelter.id, error = %e, "shelter stored, agent will be onboarded on first use");
    }
    Ok(shelter)
}

/// `GET /api/shelters`: public projection, costs and animals left out.
pub async fn list_shelters_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<ShelterSummary>>> {
    let shelters = state.manager.context().store.list_shelters()?;
    Ok(Json(shelters.iter().map(ShelterSummary::from).collect()))
}

/// `POST /api/shelters`
pub async fn create_shelter_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body?;
    require_fields(&body, &SHELTER_FIELDS, "field")?;
    let shelter = store_shelter(&state, parse_shelter(body)?).await?;
    Ok(Json(json!({
        "message": "Shelter created successfully",
        "ids": [shelter.id],
    })))
}

/// `POST /api/shelters/create`: like `POST /api/shelters`, with every
/// metrics figure required.
pub async fn create_shelter_checked_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body?;
    require_fields(&body, &SHELTER_FIELDS, "field")?;
    require_fields(&body["metrics"], &METRICS_FIELDS, "metrics field")?;
    let new = parse_shelter(body)?;

    match store_shelter(&state, new).await {
        Ok(shelter) => Ok(Json(json!({
            "status": "success",
            "message": "Shelter created successfully",
            "shelterId": shelter.id,
            "totalRecords": 1,
        }))),
        Err(e) => {
            warn!(error = %e, "shelter creation failed");
            Err(ApiError::internal("Failed to create shelter"))
        }
    }
}

/// `POST /api/donors`
pub async fn create_donor_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body?;
    require_fields(&body, &DONOR_FIELDS, "field")?;

    let invalid = |field: &str| ApiError::bad_request(format!("Invalid value for field: {field}"));
    let name = body["name"].as_str().ok_or_else(|| invalid("name"))?;
    let amount = body["amount"].as_f64().ok_or_else(|| invalid("amount"))?;
    let recurring = body["recurring"].as_bool().ok_or_else(|| invalid("recurring"))?;
    let duration = body["duration_months"]
        .as_i64()
        .ok_or_else(|| invalid("duration_months"))?;
    let duration_months = Donor::check_duration(recurring, duration)?;

    let donor = state
        .manager
        .context()
        .store
        .insert_donor(name, amount, recurring, duration_months)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    info!(donor_id = %donor.id, recurring, "donor created");
    Ok(Json(json!({
        "message": "Donor created successfully",
        "ids": [donor.id],
    })))
}

/// `GET /api/stats`: donation figures read from the chain.
pub async fn stats_handler(State(state): State<Arc<AppState>>) -> ApiResult<Json<DonationStats>> {
    let ctx = state.manager.context();
    let Some(contract) = ctx.config.chain.contract_address.as_deref() else {
        warn!("chain.contract_address is not configured");
        return Err(ApiError::internal("Failed to fetch blockchain stats"));
    };
    match donation_stats(ctx.chain.as_ref(), contract, &ctx.config.chain.known_shelters).await {
        Ok(stats) => Ok(Json(stats)),
        Err(e) => {
            warn!(error = %e, "failed to fetch blockchain stats");
            Err(ApiError::internal("Failed to fetch blockchain stats"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_missing_field_is_reported() {
        let body = json!({"name": "A", "amount": 5});
        let err = require_fields(&body, &DONOR_FIELDS, "field").unwrap_err();
        assert_eq!(err.message, "Missing required field: recurring");

        let err = require_fields(&json!({}), &METRICS_FIELDS, "metrics field").unwrap_err();
        assert_eq!(err.message, "Missing required metrics field: current_animals");
    }

    #[test]
    fn test_numeric_costs_accepted() {
        let shelter = parse_shelter(json!({
            "name": "Happy Paws",
            "location": "Portland, OR",
            "operational_costs": 12000,
            "metrics": {"current_animals": 1, "monthly_intake": 1, "neutering_count": 0, "adoption_rate": 0.5},
            "animals": [{"species": "dog", "status": "available", "intake_date": "2024-03-20"}]
        }))
        .unwrap();
        assert_eq!(shelter.operational_costs, "12000");
        assert_eq!(shelter.animals.len(), 1);
    }

    #[test]
    fn test_blank_name_or_location_rejected() {
        let body = |name: &str, location: &str| {
            json!({
                "name": name,
                "location": location,
                "operational_costs": "100",
                "metrics": {"current_animals": 0, "monthly_intake": 0, "neutering_count": 0, "adoption_rate": 0.0},
                "animals": []
            })
        };
        let err = parse_shelter(body("", "Portland, OR")).unwrap_err();
        assert_eq!(err.message, "Invalid value for field: name");
        let err = parse_shelter(body("Happy Paws", "   ")).unwrap_err();
        assert_eq!(err.message, "Invalid value for field: location");
    }
}
