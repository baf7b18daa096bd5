//! Instruction text sent to the inference provider.
//!
//! The system instruction defines the semantics of the output schema
//! (validation rules, sentinel values, one-record-per-image contract), so it
//! is kept as a versioned asset rather than an inline literal. Changing the
//! asset changes extraction behavior.

/// System instruction for the card analysis task, version 1.
pub const CARD_ANALYSIS_PROMPT: &str = include_str!("../prompts/card-analysis-v1.txt");

/// Builds the per-request user instruction stating the exact image count and
/// requiring exactly that many records in the response.
pub fn user_instruction(image_count: usize) -> String {
    format!(
        "Analyze ALL {count} image(s). First validate if each image contains a PSA-graded NBA card, \
         then extract information for valid cards. Return {count} card object(s) in the cards array.",
        count = image_count
    )
}
