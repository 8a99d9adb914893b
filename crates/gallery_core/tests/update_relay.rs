use gallery_core::{update, AppState, Effect, Msg};
use pretty_assertions::assert_eq;

fn frame(origin: &str) -> Msg {
    Msg::FrameMessage {
        origin: origin.to_string(),
        key: "bagID".to_string(),
        value: "bag-42".to_string(),
    }
}

#[test]
fn allowed_origin_is_persisted() {
    let state = AppState::with_allowed_origins(["https://designer.example.com/"]);
    let (_, effects) = update(state, frame("https://designer.example.com"));

    assert_eq!(
        effects,
        vec![Effect::PersistEntry {
            key: "bagID".to_string(),
            value: "bag-42".to_string(),
        }]
    );
}

#[test]
fn unknown_origin_is_dropped() {
    let state = AppState::with_allowed_origins(["https://designer.example.com"]);
    let (_, effects) = update(state, frame("https://evil.example.net"));
    assert!(effects.is_empty());
}

#[test]
fn empty_allow_list_rejects_everything() {
    let (_, effects) = update(AppState::new(), frame("https://designer.example.com"));
    assert!(effects.is_empty());
}
