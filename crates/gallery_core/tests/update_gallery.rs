use std::sync::Once;

use gallery_core::{update, AppState, Effect, GalleryStatus, Msg};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(gallery_logging::initialize_for_tests);
}

fn listed(keys: &[&str]) -> Msg {
    Msg::KeysListed {
        base_url: "https://prints.s3.amazonaws.com/".to_string(),
        prefix: "prints/".to_string(),
        keys: keys.iter().map(|k| k.to_string()).collect(),
    }
}

#[test]
fn listed_keys_become_sorted_titled_tiles() {
    init_logging();
    let (mut state, effects) = update(
        AppState::new(),
        listed(&["prints/print10.jpg", "prints/print2.jpg", "prints/Blue_Heron.png"]),
    );

    assert!(effects.is_empty());
    assert!(state.consume_dirty());
    let view = state.view();
    assert_eq!(view.status, GalleryStatus::Ready);
    let titles: Vec<_> = view.tiles.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Blue Heron", "print2", "print10"]);
    assert_eq!(
        view.tiles[0].url,
        "https://prints.s3.amazonaws.com/prints/Blue_Heron.png"
    );
    assert!(view.tiles.iter().all(|t| !t.selected));
}

#[test]
fn empty_listing_is_reported_as_empty() {
    let (state, _) = update(AppState::new(), listed(&[]));
    assert_eq!(state.view().status, GalleryStatus::Empty);
}

#[test]
fn listing_failure_renders_inline_message() {
    let (state, _) = update(AppState::new(), listed(&["prints/a.jpg"]));
    let (state, effects) = update(state, Msg::ListingFailed("S3 list error: 403".to_string()));

    assert!(effects.is_empty());
    assert!(state.tiles().is_empty());
    assert_eq!(
        state.status(),
        &GalleryStatus::Failed("Could not load gallery. S3 list error: 403".to_string())
    );
}

#[test]
fn config_rejection_halts_gallery() {
    let (state, _) = update(
        AppState::new(),
        Msg::ConfigRejected("missing required attribute `data-bucket`".to_string()),
    );
    assert!(matches!(state.status(), GalleryStatus::Failed(msg) if msg.starts_with("Configuration error")));
}

#[test]
fn selecting_a_tile_fills_and_opens_preview() {
    init_logging();
    let (state, _) = update(AppState::new(), listed(&["prints/sea-glass.jpg", "prints/tide.jpg"]));
    let (state, effects) = update(state, Msg::TileSelected { index: 1 });

    assert_eq!(state.selected_name(), Some("tide"));
    assert_eq!(
        effects,
        vec![
            Effect::FillFields {
                value: "tide".to_string()
            },
            Effect::OpenPreview {
                url: "https://prints.s3.amazonaws.com/prints/tide.jpg".to_string(),
                caption: "tide".to_string(),
            },
        ]
    );
    let selected: Vec<_> = state.view().tiles.iter().map(|t| t.selected).collect();
    assert_eq!(selected, vec![false, true]);
}

#[test]
fn reselecting_overwrites_previous_selection() {
    let (state, _) = update(AppState::new(), listed(&["prints/a.jpg", "prints/b.jpg"]));
    let (state, _) = update(state, Msg::TileSelected { index: 0 });
    let (state, _) = update(state, Msg::TileSelected { index: 1 });

    assert_eq!(state.selected_name(), Some("b"));
    assert_eq!(state.view().tiles.iter().filter(|t| t.selected).count(), 1);
}

#[test]
fn unknown_tile_index_is_ignored() {
    let (state, _) = update(AppState::new(), listed(&["prints/a.jpg"]));
    let (state, effects) = update(state, Msg::TileSelected { index: 7 });

    assert!(effects.is_empty());
    assert_eq!(state.selected_name(), None);
}
