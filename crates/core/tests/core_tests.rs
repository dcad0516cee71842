//! Integration tests for the core crate.

use std::time::Duration;

use masjid_display_core::model::{ContentItem, DisplayState, Playlist, SponsorshipTier};
use masjid_display_core::rotation::{LoadOutcome, RotationEngine, Tick};

fn item(id: &str, order: i64) -> ContentItem {
    ContentItem::new(id, format!("title {id}"), order)
}

fn playlist(ids: &[&str]) -> Playlist {
    Playlist::from_items(ids.iter().enumerate().map(|(i, id)| item(id, i as i64)))
}

#[test]
fn test_display_state_serde() {
    let serialized = serde_json::to_string(&DisplayState::Displaying).unwrap();
    assert_eq!(serialized, r#""displaying""#);
    let deserialized: DisplayState = serde_json::from_str(&serialized).unwrap();
    assert_eq!(deserialized, DisplayState::Displaying);
}

#[test]
fn playlist_excludes_inactive_items() {
    let mut items: Vec<ContentItem> = (0..5).map(|i| item(&format!("c{i}"), i)).collect();
    items[1].is_active = false;
    items[3].is_active = false;

    let playlist = Playlist::from_items(items);

    assert_eq!(playlist.len(), 3);
    assert!(!playlist.contains("c1"));
    assert!(!playlist.contains("c3"));
    assert_eq!(playlist.ids().collect::<Vec<_>>(), vec!["c0", "c2", "c4"]);
}

#[test]
fn playlist_sorts_by_order_then_id_and_dedupes() {
    let playlist = Playlist::from_items(vec![
        item("b", 2),
        item("z", 1),
        item("a", 2),
        item("a", 0),
    ]);
    // the second "a" is a duplicate and loses to the first occurrence (order 2)
    assert_eq!(playlist.ids().collect::<Vec<_>>(), vec!["z", "a", "b"]);
}

#[test]
fn playlist_respects_schedule_window() {
    let day = chrono::NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
    let mut expired = item("expired", 0);
    expired.end_date = chrono::NaiveDate::from_ymd_opt(2025, 3, 9);
    let mut future = item("future", 1);
    future.start_date = chrono::NaiveDate::from_ymd_opt(2025, 3, 11);
    let mut last_day = item("last-day", 2);
    last_day.end_date = Some(day);

    let playlist = Playlist::scheduled_on(vec![expired, future, last_day], day);

    assert_eq!(playlist.ids().collect::<Vec<_>>(), vec!["last-day"]);
}

#[test]
fn advancing_len_times_returns_to_start() {
    for len in 1..=7 {
        let ids: Vec<String> = (0..len).map(|i| format!("c{i}")).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let mut engine = RotationEngine::default();
        engine.load(playlist(&refs));

        let mut visited = Vec::new();
        for _ in 0..len {
            visited.push(engine.state().current_index);
            engine.advance();
        }

        assert_eq!(engine.state().current_index, 0, "len {len}");
        visited.sort_unstable();
        assert_eq!(visited, (0..len).collect::<Vec<_>>(), "len {len}");
    }
}

#[test]
fn loading_empty_playlist_has_no_current_item() {
    let mut engine = RotationEngine::default();
    engine.load(playlist(&["a", "b", "c"]));
    engine.advance();

    engine.load(Playlist::empty());

    assert!(engine.current().is_none());
    assert_eq!(engine.state().current_index, 0);
    engine.advance();
    assert_eq!(engine.tick(), Tick::Empty);
    assert!(engine.current().is_none());
}

#[test]
fn loading_identical_playlist_keeps_index() {
    let mut engine = RotationEngine::default();
    assert_eq!(engine.load(playlist(&["a", "b", "c"])), LoadOutcome::Reset);
    engine.advance();
    engine.advance();
    let before = engine.state();

    assert_eq!(engine.load(playlist(&["a", "b", "c"])), LoadOutcome::Unchanged);

    assert_eq!(engine.state(), before);
    assert_eq!(engine.current().map(|c| c.id.as_str()), Some("c"));
}

#[test]
fn loading_different_playlist_resets_index() {
    let mut engine = RotationEngine::default();
    engine.load(playlist(&["a", "b", "c"]));
    engine.advance();
    let version = engine.state().playlist_version;

    assert_eq!(engine.load(playlist(&["a", "b", "d"])), LoadOutcome::Reset);

    assert_eq!(engine.state().current_index, 0);
    assert_eq!(engine.state().playlist_version, version + 1);
}

#[test]
fn resync_preserves_index_when_item_matches() {
    let mut engine = RotationEngine::default();
    engine.load(playlist(&["a", "b", "c"]));
    engine.advance();

    assert_eq!(engine.resync(playlist(&["a", "b", "d", "e"])), LoadOutcome::Preserved);
    assert_eq!(engine.current().map(|c| c.id.as_str()), Some("b"));

    assert_eq!(engine.resync(playlist(&["x", "y"])), LoadOutcome::Reset);
    assert_eq!(engine.state().current_index, 0);
}

#[test]
fn resync_into_shorter_playlist_resets() {
    let mut engine = RotationEngine::default();
    engine.load(playlist(&["a", "b", "c"]));
    engine.advance();
    engine.advance();

    assert_eq!(engine.resync(playlist(&["a"])), LoadOutcome::Reset);
    assert_eq!(engine.current().map(|c| c.id.as_str()), Some("a"));
}

#[test]
fn single_item_playlist_repeats() {
    let mut engine = RotationEngine::default();
    engine.load(playlist(&["only"]));

    assert_eq!(engine.tick(), Tick::Repeated);
    assert_eq!(engine.state().current_index, 0);
    engine.advance();
    assert_eq!(engine.current().map(|c| c.id.as_str()), Some("only"));
}

#[test]
fn pause_survives_reload() {
    let mut engine = RotationEngine::default();
    engine.load(playlist(&["a", "b"]));
    engine.pause();

    engine.load(playlist(&["c", "d"]));

    assert!(engine.state().is_paused);
    assert_eq!(engine.tick(), Tick::Suppressed);
}

#[test]
fn dwell_uses_item_override_else_default() {
    let mut sponsored = item("sponsored", 0);
    sponsored.sponsorship_amount = 5000.0;
    let mut long = item("long", 1);
    long.dwell_secs = Some(45);

    let mut engine = RotationEngine::new(Duration::from_secs(12));
    engine.load(Playlist::from_items(vec![sponsored, long]));

    assert_eq!(engine.current_dwell(), Duration::from_secs(12));
    engine.advance();
    assert_eq!(engine.current_dwell(), Duration::from_secs(45));
}

#[test]
fn sponsorship_tiers() {
    assert_eq!(SponsorshipTier::from_amount(0.0), None);
    assert_eq!(SponsorshipTier::from_amount(49.99), None);
    assert_eq!(SponsorshipTier::from_amount(50.0), Some(SponsorshipTier::Bronze));
    assert_eq!(SponsorshipTier::from_amount(200.0), Some(SponsorshipTier::Silver));
    assert_eq!(SponsorshipTier::from_amount(999.0), Some(SponsorshipTier::Gold));
    assert_eq!(SponsorshipTier::from_amount(1000.0), Some(SponsorshipTier::Platinum));
}
