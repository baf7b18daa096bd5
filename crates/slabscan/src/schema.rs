//! Result schema and validation contract for card analysis.
//!
//! The schema plays three roles: it is sent to the provider as the
//! structured-output declaration, the relay treats it as a passive contract
//! (forwarding without validating), and the client uses it to interpret
//! partial results and to enumerate fields for rendering.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Versioned response schema declaration. Every streamed object must
/// conform to this shape once complete.
pub const RESPONSE_SCHEMA_JSON: &str = include_str!("../schema/card-analysis-response-v1.json");

/// Extraction fields in render order, as (wire name, display label) pairs.
///
/// All of these are declared required in the schema; only `validationError`
/// is optional, so partial-object merging never has to distinguish "field
/// doesn't exist" from "field not yet filled" for the common fields.
pub const EXTRACTION_FIELD_LABELS: &[(&str, &str)] = &[
    ("playerName", "Player Name"),
    ("teamName", "Team"),
    ("cardYear", "Year"),
    ("cardBrand", "Brand"),
    ("cardSeries", "Series"),
    ("cardNumber", "Card Number"),
    ("psaGrade", "PSA Grade"),
    ("psaCertNumber", "PSA Cert #"),
    ("cardType", "Card Type"),
    ("isRookieCard", "Rookie Card"),
    ("cardCondition", "Condition"),
    ("specialFeatures", "Special Features"),
];

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Invalid embedded schema JSON: {0}")]
    InvalidEmbedded(String),

    #[error("Failed to compile response schema: {0}")]
    Compile(String),

    #[error("Result does not conform to the card schema: {errors}")]
    Nonconforming { errors: String },
}

/// One fully-extracted card, corresponding to exactly one submitted image.
///
/// Invalid images still produce the full shape with placeholder values in
/// the extraction fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    /// Whether the image contains a valid PSA-graded NBA card.
    pub is_valid: bool,
    /// Rejection reason, populated only when `is_valid` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<String>,
    pub player_name: String,
    pub team_name: String,
    pub card_year: String,
    pub card_brand: String,
    pub card_series: String,
    pub card_number: String,
    pub psa_grade: String,
    pub psa_cert_number: String,
    pub card_type: String,
    pub is_rookie_card: bool,
    pub card_condition: String,
    pub special_features: String,
}

/// The completed batch result: one record per input image, in submission
/// order. The relay instructs the provider to honor the count but does not
/// enforce it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardBatch {
    pub cards: Vec<CardRecord>,
}

/// Parses the embedded response schema declaration.
pub fn response_schema() -> Result<serde_json::Value, SchemaError> {
    serde_json::from_str(RESPONSE_SCHEMA_JSON).map_err(|e| SchemaError::InvalidEmbedded(e.to_string()))
}

/// Validates a final (non-partial) batch value against the response schema.
///
/// The relay never calls this; it trusts the provider stream. Used by tests
/// and by callers that want a hard conformance check after completion.
pub fn validate_batch(value: &serde_json::Value) -> Result<(), SchemaError> {
    let schema = response_schema()?;

    let compiled =
        jsonschema::validator_for(&schema).map_err(|e| SchemaError::Compile(e.to_string()))?;

    let error_messages: Vec<String> = compiled
        .iter_errors(value)
        .map(|e| format!("{} at {}", e, e.instance_path()))
        .collect();
    if !error_messages.is_empty() {
        return Err(SchemaError::Nonconforming {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}
