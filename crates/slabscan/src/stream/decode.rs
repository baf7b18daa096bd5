//! Incremental decoding of the streamed batch result.
//!
//! The relay forwards raw text chunks of one growing JSON document. The
//! decoder buffers them, completes the current prefix with
//! [`complete_partial_json`](super::repair::complete_partial_json), and
//! deserializes it into [`PartialBatch`] snapshots. Fields that have not
//! arrived yet are `None`; consumers must render those as "still loading",
//! never as empty values.

use serde::{Deserialize, Serialize};

use super::repair::complete_partial_json;

/// One card record while streaming: any subset of fields may be populated.
///
/// All fields are optional here even though the final schema requires them;
/// an absent field means "not yet known", not "known to be blank".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialCardRecord {
    pub is_valid: Option<bool>,
    pub validation_error: Option<String>,
    pub player_name: Option<String>,
    pub team_name: Option<String>,
    pub card_year: Option<String>,
    pub card_brand: Option<String>,
    pub card_series: Option<String>,
    pub card_number: Option<String>,
    pub psa_grade: Option<String>,
    pub psa_cert_number: Option<String>,
    pub card_type: Option<String>,
    pub is_rookie_card: Option<bool>,
    pub card_condition: Option<String>,
    pub special_features: Option<String>,
}

impl PartialCardRecord {
    /// Merges a newer snapshot of the same record over this one. Populated
    /// fields are never un-populated, so a sequence of merges is monotonic
    /// even if an intermediate parse regressed.
    pub fn merged(&self, update: PartialCardRecord) -> PartialCardRecord {
        PartialCardRecord {
            is_valid: update.is_valid.or(self.is_valid),
            validation_error: update.validation_error.or_else(|| self.validation_error.clone()),
            player_name: update.player_name.or_else(|| self.player_name.clone()),
            team_name: update.team_name.or_else(|| self.team_name.clone()),
            card_year: update.card_year.or_else(|| self.card_year.clone()),
            card_brand: update.card_brand.or_else(|| self.card_brand.clone()),
            card_series: update.card_series.or_else(|| self.card_series.clone()),
            card_number: update.card_number.or_else(|| self.card_number.clone()),
            psa_grade: update.psa_grade.or_else(|| self.psa_grade.clone()),
            psa_cert_number: update.psa_cert_number.or_else(|| self.psa_cert_number.clone()),
            card_type: update.card_type.or_else(|| self.card_type.clone()),
            is_rookie_card: update.is_rookie_card.or(self.is_rookie_card),
            card_condition: update.card_condition.or_else(|| self.card_condition.clone()),
            special_features: update.special_features.or_else(|| self.special_features.clone()),
        }
    }

    /// Converts to the final record shape once every required field is
    /// populated. Returns `None` while anything is still missing.
    pub fn to_complete(&self) -> Option<crate::schema::CardRecord> {
        Some(crate::schema::CardRecord {
            is_valid: self.is_valid?,
            validation_error: self.validation_error.clone(),
            player_name: self.player_name.clone()?,
            team_name: self.team_name.clone()?,
            card_year: self.card_year.clone()?,
            card_brand: self.card_brand.clone()?,
            card_series: self.card_series.clone()?,
            card_number: self.card_number.clone()?,
            psa_grade: self.psa_grade.clone()?,
            psa_cert_number: self.psa_cert_number.clone()?,
            card_type: self.card_type.clone()?,
            is_rookie_card: self.is_rookie_card?,
            card_condition: self.card_condition.clone()?,
            special_features: self.special_features.clone()?,
        })
    }

    /// Number of populated fields, used to assert merge monotonicity.
    pub fn populated_count(&self) -> usize {
        [
            self.is_valid.is_some(),
            self.validation_error.is_some(),
            self.player_name.is_some(),
            self.team_name.is_some(),
            self.card_year.is_some(),
            self.card_brand.is_some(),
            self.card_series.is_some(),
            self.card_number.is_some(),
            self.psa_grade.is_some(),
            self.psa_cert_number.is_some(),
            self.card_type.is_some(),
            self.is_rookie_card.is_some(),
            self.card_condition.is_some(),
            self.special_features.is_some(),
        ]
        .iter()
        .filter(|populated| **populated)
        .count()
    }
}

/// The in-progress batch result visible to the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialBatch {
    pub cards: Vec<PartialCardRecord>,
}

impl PartialBatch {
    /// Merges a newer snapshot over this one, record by record. Records
    /// present only in the newer snapshot are appended.
    pub fn merged(&self, update: PartialBatch) -> PartialBatch {
        let mut cards = Vec::with_capacity(update.cards.len().max(self.cards.len()));
        for (index, record) in update.cards.into_iter().enumerate() {
            match self.cards.get(index) {
                Some(existing) => cards.push(existing.merged(record)),
                None => cards.push(record),
            }
        }
        // A shrinking parse never drops records already seen.
        if cards.len() < self.cards.len() {
            cards.extend_from_slice(&self.cards[cards.len()..]);
        }
        PartialBatch { cards }
    }

    /// Converts to the final batch once every record is fully populated.
    pub fn to_complete(&self) -> Option<crate::schema::CardBatch> {
        let cards = self
            .cards
            .iter()
            .map(|record| record.to_complete())
            .collect::<Option<Vec<_>>>()?;
        Some(crate::schema::CardBatch { cards })
    }
}

/// Accumulates streamed text and produces progressively more complete
/// [`PartialBatch`] snapshots.
///
/// Snapshots replace each other wholesale; the decoder never mutates a
/// previously returned snapshot, so clones handed to concurrent readers stay
/// internally consistent.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buffer: String,
    latest: PartialBatch,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk of relay output. Returns the updated snapshot when
    /// the buffered prefix is currently decodable, `None` otherwise (the
    /// chunk is still buffered either way).
    pub fn push(&mut self, chunk: &str) -> Option<PartialBatch> {
        self.buffer.push_str(chunk);

        let completed = complete_partial_json(&self.buffer)?;
        let parsed: PartialBatch = match serde_json::from_str(&completed) {
            Ok(batch) => batch,
            Err(e) => {
                log::debug!("partial snapshot not yet decodable: {}", e);
                return None;
            }
        };

        self.latest = self.latest.merged(parsed);
        Some(self.latest.clone())
    }

    /// The most recent snapshot.
    pub fn latest(&self) -> &PartialBatch {
        &self.latest
    }

    /// The raw text accumulated so far.
    pub fn raw(&self) -> &str {
        &self.buffer
    }
}

/// Reassembles UTF-8 text from byte chunks split at arbitrary boundaries.
#[derive(Debug, Default)]
pub struct Utf8ChunkBuf {
    pending: Vec<u8>,
}

impl Utf8ChunkBuf {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends raw bytes and returns the longest decodable prefix, keeping
    /// any trailing incomplete character for the next call.
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        match std::str::from_utf8(&self.pending) {
            Ok(text) => {
                let text = text.to_string();
                self.pending.clear();
                text
            }
            Err(e) => {
                let valid = e.valid_up_to();
                let text = String::from_utf8_lossy(&self.pending[..valid]).into_owned();
                self.pending.drain(..valid);
                text
            }
        }
    }
}
