//! Pure rendering model for the streaming result.
//!
//! Three distinctions matter while streaming: a record whose validity is
//! not yet known renders as loading (neither valid nor invalid), a record
//! known invalid renders its rejection reason and suppresses the extraction
//! fields, and an individual missing field renders a loading placeholder,
//! never a blank. Summary counts are recomputed from the snapshot on every
//! render.

use super::session::{SessionPhase, SessionSnapshot};
use crate::schema::EXTRACTION_FIELD_LABELS;
use crate::stream::PartialCardRecord;

pub const LOADING_PLACEHOLDER: &str = "Loading...";
const DEFAULT_INVALID_REASON: &str = "Not a valid PSA NBA card";

/// Per-field tri-state: not yet known vs known value. A field the provider
/// filled with an empty string renders as loading too, matching the
/// original client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldProgress {
    Loading,
    Value(String),
}

impl FieldProgress {
    fn from_text(value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.is_empty() => FieldProgress::Value(v.to_string()),
            _ => FieldProgress::Loading,
        }
    }

    fn from_flag(value: Option<bool>) -> Self {
        match value {
            Some(true) => FieldProgress::Value("Yes".to_string()),
            Some(false) => FieldProgress::Value("No".to_string()),
            None => FieldProgress::Loading,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            FieldProgress::Loading => LOADING_PLACEHOLDER,
            FieldProgress::Value(v) => v,
        }
    }
}

/// Validity tri-state for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardStatus {
    /// Validity flag has not arrived yet.
    Pending,
    Valid,
    Invalid { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    pub title: String,
    pub status: CardStatus,
    /// Extraction fields in catalog order; empty for invalid records.
    pub fields: Vec<(&'static str, FieldProgress)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchView {
    pub cards: Vec<CardView>,
    pub valid_count: usize,
    pub invalid_count: usize,
    pub analyzing: bool,
    pub error: Option<String>,
}

/// Looks up one extraction field on a partial record by its wire name.
fn extraction_field(record: &PartialCardRecord, wire_name: &str) -> FieldProgress {
    match wire_name {
        "playerName" => FieldProgress::from_text(record.player_name.as_deref()),
        "teamName" => FieldProgress::from_text(record.team_name.as_deref()),
        "cardYear" => FieldProgress::from_text(record.card_year.as_deref()),
        "cardBrand" => FieldProgress::from_text(record.card_brand.as_deref()),
        "cardSeries" => FieldProgress::from_text(record.card_series.as_deref()),
        "cardNumber" => FieldProgress::from_text(record.card_number.as_deref()),
        "psaGrade" => FieldProgress::from_text(record.psa_grade.as_deref()),
        "psaCertNumber" => FieldProgress::from_text(record.psa_cert_number.as_deref()),
        "cardType" => FieldProgress::from_text(record.card_type.as_deref()),
        "isRookieCard" => FieldProgress::from_flag(record.is_rookie_card),
        "cardCondition" => FieldProgress::from_text(record.card_condition.as_deref()),
        "specialFeatures" => FieldProgress::from_text(record.special_features.as_deref()),
        _ => FieldProgress::Loading,
    }
}

fn card_view(index: usize, record: &PartialCardRecord) -> CardView {
    let status = match record.is_valid {
        None => CardStatus::Pending,
        Some(true) => CardStatus::Valid,
        Some(false) => CardStatus::Invalid {
            reason: record
                .validation_error
                .clone()
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| DEFAULT_INVALID_REASON.to_string()),
        },
    };

    let fields = if matches!(status, CardStatus::Invalid { .. }) {
        Vec::new()
    } else {
        EXTRACTION_FIELD_LABELS
            .iter()
            .map(|(wire_name, label)| (*label, extraction_field(record, wire_name)))
            .collect()
    };

    CardView {
        title: format!("Card {}", index + 1),
        status,
        fields,
    }
}

/// Builds the render model from the current snapshot.
pub fn batch_view(snapshot: &SessionSnapshot) -> BatchView {
    let cards: Vec<CardView> = snapshot
        .batch
        .cards
        .iter()
        .enumerate()
        .map(|(index, record)| card_view(index, record))
        .collect();

    let valid_count = snapshot
        .batch
        .cards
        .iter()
        .filter(|c| c.is_valid == Some(true))
        .count();
    let invalid_count = snapshot
        .batch
        .cards
        .iter()
        .filter(|c| c.is_valid == Some(false))
        .count();

    BatchView {
        cards,
        valid_count,
        invalid_count,
        analyzing: snapshot.phase == SessionPhase::Streaming,
        error: snapshot.error.clone(),
    }
}

/// Renders the view as terminal lines.
pub fn render_lines(view: &BatchView) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(error) = &view.error {
        lines.push(format!("Error: {}", error));
        lines.push(String::new());
    }

    if view.cards.is_empty() {
        if view.analyzing {
            lines.push("Analyzing cards...".to_string());
        }
        return lines;
    }

    let plural = if view.cards.len() > 1 { "s" } else { "" };
    lines.push(format!("Analysis Results ({} card{})", view.cards.len(), plural));
    lines.push(format!(
        "{} valid \u{2022} {} invalid",
        view.valid_count, view.invalid_count
    ));

    for card in &view.cards {
        lines.push(String::new());
        match &card.status {
            CardStatus::Pending => lines.push(format!("{} \u{2014} analyzing", card.title)),
            CardStatus::Valid => lines.push(card.title.clone()),
            CardStatus::Invalid { reason } => {
                lines.push(format!("{} \u{26a0} Invalid", card.title));
                lines.push(format!("  {}", reason));
            }
        }
        for (label, progress) in &card.fields {
            lines.push(format!("  {:<17} {}", format!("{}:", label), progress.text()));
        }
    }

    lines
}
