use masjid_display_core::api::{ContentListResponse, PrayerTimesResponse};
use masjid_display_core::model::Playlist;
use masjid_display_core::validation::{
    validate_content_batch, validate_content_record, validate_prayer_response, Decision,
};
use masjid_display_core::DisplayError;
use serde_json::json;

#[test]
fn accepts_well_formed_record() {
    let record = json!({
        "id": "c-1",
        "title": "Kuliah Maghrib",
        "media_ref": "https://cdn.example/poster.png",
        "sponsorship_amount": 250,
        "is_active": true,
        "display_order": 3
    });

    let (item, out) = validate_content_record(0, &record);
    let item = item.expect("record accepted");

    assert_eq!(out.decision, Decision::Accept);
    assert_eq!(item.id, "c-1");
    assert_eq!(item.display_order, 3);
    assert_eq!(item.sponsorship_amount, 250.0);
    assert_eq!(item.media_ref, "https://cdn.example/poster.png");
}

#[test]
fn drops_records_with_missing_id_or_non_boolean_active() {
    let records = vec![
        json!({ "title": "no id", "is_active": true, "display_order": 0 }),
        json!({ "id": "", "title": "blank id", "is_active": true, "display_order": 0 }),
        json!({ "id": "c-2", "title": "bad flag", "is_active": "yes", "display_order": 1 }),
        json!({ "id": "c-3", "title": "fine", "is_active": true, "display_order": 2 }),
        json!("not an object"),
    ];

    let batch = validate_content_batch(&records);

    assert_eq!(batch.items.len(), 1);
    assert_eq!(batch.items[0].id, "c-3");
    let rejected: Vec<usize> = batch.rejected().map(|(i, _)| *i).collect();
    assert_eq!(rejected, vec![0, 1, 2, 4]);
}

#[test]
fn status_field_stands_in_for_is_active() {
    let records = vec![
        json!({ "id": "a", "title": "A", "status": "active", "display_order": 0 }),
        json!({ "id": "b", "title": "B", "status": "expired", "display_order": 1 }),
    ];

    let batch = validate_content_batch(&records);

    assert_eq!(batch.items.len(), 2);
    assert!(batch.items[0].is_active);
    assert!(!batch.items[1].is_active);
    assert_eq!(Playlist::from_items(batch.items).len(), 1);
}

#[test]
fn five_records_two_inactive_yield_three_item_playlist() {
    let records: Vec<_> = (0..5)
        .map(|i| {
            json!({
                "id": format!("c{i}"),
                "title": format!("Content {i}"),
                "is_active": i % 2 == 0,
                "display_order": i
            })
        })
        .collect();

    let playlist = Playlist::from_items(validate_content_batch(&records).items);

    assert_eq!(playlist.len(), 3);
    assert!(!playlist.contains("c1"));
    assert!(!playlist.contains("c3"));
}

#[test]
fn clamps_carousel_duration_with_warning() {
    let record = json!({
        "id": "v", "title": "video", "is_active": true, "display_order": 0,
        "carousel_duration": 900, "url": "https://youtube.example/watch?v=1"
    });

    let (item, out) = validate_content_record(0, &record);
    let item = item.unwrap();

    assert_eq!(out.decision, Decision::Warn);
    assert_eq!(item.dwell_secs, Some(300));
    assert_eq!(item.media_ref, "https://youtube.example/watch?v=1");
}

#[test]
fn rejects_negative_sponsorship() {
    let record = json!({
        "id": "n", "title": "neg", "is_active": true, "display_order": 0,
        "sponsorship_amount": -10
    });
    let (item, out) = validate_content_record(7, &record);
    assert!(item.is_none());
    assert_eq!(out.decision, Decision::Reject);
    assert!(out.violations[0].starts_with("record[7] (n)"));
}

#[test]
fn content_response_accepts_envelope_and_bare_array() {
    let enveloped: ContentListResponse =
        serde_json::from_value(json!({ "data": [{ "id": "a" }], "meta": { "total": 1 } })).unwrap();
    assert_eq!(enveloped.into_records().len(), 1);

    let bare: ContentListResponse =
        serde_json::from_value(json!([{ "id": "a" }, { "id": "b" }])).unwrap();
    assert_eq!(bare.into_records().len(), 2);
}

#[test]
fn prayer_response_drops_bad_times_only() {
    let resp: PrayerTimesResponse = serde_json::from_value(json!({
        "zone": "SGR01",
        "date": "2025-03-01",
        "times": { "subuh": "05:45", "zohor": "13:15:00", "syuruk": "late", "asar": 1630 }
    }))
    .unwrap();

    let (schedule, out) = validate_prayer_response(&resp).unwrap();

    assert_eq!(out.decision, Decision::Warn);
    assert_eq!(out.warnings.len(), 2);
    assert_eq!(schedule.times.len(), 2);
    assert_eq!(schedule.zone_id, "SGR01");
}

#[test]
fn prayer_response_without_usable_times_is_an_error() {
    let resp: PrayerTimesResponse = serde_json::from_value(json!({
        "zone": "SGR01", "date": "2025-03-01", "times": { "subuh": "??" }
    }))
    .unwrap();
    assert!(matches!(validate_prayer_response(&resp), Err(DisplayError::Validation(_))));

    let resp: PrayerTimesResponse = serde_json::from_value(json!({
        "zone": "SGR01", "date": "March 1", "times": { "subuh": "05:45" }
    }))
    .unwrap();
    assert!(matches!(validate_prayer_response(&resp), Err(DisplayError::Validation(_))));
}
