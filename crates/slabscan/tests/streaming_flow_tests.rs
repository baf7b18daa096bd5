//! Client-side streaming flow: a chunked provider document driven through
//! the session and rendered, mirroring a real mixed-validity submission.

mod common;

use common::{chunked, two_card_document};
use slabscan::client::{batch_view, render_lines, AnalysisSession, CardStatus, SelectedImage};
use slabscan::client::{FieldProgress, SessionPhase};
use slabscan::schema::EXTRACTION_FIELD_LABELS;

fn selection(count: usize) -> Vec<SelectedImage> {
    (0..count)
        .map(|i| SelectedImage {
            name: format!("image-{}.jpg", i),
            data_url: format!("data:image/jpeg;base64,IMG{}", i),
        })
        .collect()
}

#[test]
fn test_mixed_batch_streams_to_expected_result() {
    let mut session = AnalysisSession::new();
    session.select_images(selection(2)).unwrap();
    session.begin_submission().unwrap();

    for chunk in chunked(&two_card_document(), 13) {
        session.apply_chunk(&chunk);

        // While streaming, no field ever renders as an empty string.
        let view = batch_view(&session.snapshot());
        for card in &view.cards {
            for (_, progress) in &card.fields {
                assert!(!progress.text().is_empty());
            }
        }
    }
    session.complete();

    assert_eq!(session.phase(), SessionPhase::Completed);

    let batch = session.final_batch().expect("batch should be complete");
    assert_eq!(batch.cards.len(), 2);

    assert!(batch.cards[0].is_valid);
    assert_eq!(batch.cards[0].player_name, "Luka Doncic");
    assert_eq!(batch.cards[0].team_name, "Dallas Mavericks");
    assert_eq!(batch.cards[0].psa_grade, "10");

    assert!(!batch.cards[1].is_valid);
    assert_eq!(
        batch.cards[1].validation_error.as_deref(),
        Some("Image too blurry")
    );
    assert_eq!(batch.cards[1].player_name, "N/A");
}

#[test]
fn test_final_view_gates_on_validity() {
    let mut session = AnalysisSession::new();
    session.select_images(selection(2)).unwrap();
    session.begin_submission().unwrap();
    for chunk in chunked(&two_card_document(), 64) {
        session.apply_chunk(&chunk);
    }
    session.complete();

    let view = batch_view(&session.snapshot());
    assert_eq!(view.valid_count, 1);
    assert_eq!(view.invalid_count, 1);

    assert_eq!(view.cards[0].status, CardStatus::Valid);
    assert_eq!(view.cards[0].fields.len(), EXTRACTION_FIELD_LABELS.len());
    assert!(view.cards[0]
        .fields
        .iter()
        .all(|(_, p)| *p != FieldProgress::Loading));

    assert_eq!(
        view.cards[1].status,
        CardStatus::Invalid {
            reason: "Image too blurry".to_string()
        }
    );
    assert!(view.cards[1].fields.is_empty());

    let lines = render_lines(&view);
    assert!(lines.iter().any(|l| l.contains("1 valid")));
    assert!(lines.iter().any(|l| l.contains("1 invalid")));
    assert!(lines.iter().any(|l| l.contains("Luka Doncic")));
    assert!(lines.iter().any(|l| l.contains("Image too blurry")));
}

#[test]
fn test_stream_failure_freezes_partial_view() {
    let document = two_card_document();
    let half = &document[..document.len() / 2];

    let mut session = AnalysisSession::new();
    session.select_images(selection(2)).unwrap();
    session.begin_submission().unwrap();
    for chunk in chunked(half, 16) {
        session.apply_chunk(&chunk);
    }
    session.fail("stream terminated early");

    let view = batch_view(&session.snapshot());
    assert_eq!(view.error.as_deref(), Some("stream terminated early"));
    assert!(!view.cards.is_empty());
    assert_eq!(view.cards[0].status, CardStatus::Valid);
    assert!(session.final_batch().is_none());
}
