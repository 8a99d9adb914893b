use gallery_core::{update, AppState, Effect, Msg};
use pretty_assertions::assert_eq;

fn with_selection() -> AppState {
    let (state, _) = update(
        AppState::new(),
        Msg::KeysListed {
            base_url: "https://prints.s3.amazonaws.com/".to_string(),
            prefix: "prints/".to_string(),
            keys: vec!["prints/Fern_Study.jpg".to_string()],
        },
    );
    let (state, _) = update(state, Msg::TileSelected { index: 0 });
    state
}

#[test]
fn add_to_cart_without_selection_starts_nothing() {
    let (state, effects) = update(AppState::new(), Msg::AddToCartClicked);

    assert!(effects.is_empty());
    assert!(!state.is_watch_active());
}

#[test]
fn add_to_cart_starts_watch_with_selected_name() {
    let (state, effects) = update(with_selection(), Msg::AddToCartClicked);

    assert_eq!(
        effects,
        vec![Effect::StartModalWatch {
            value: "Fern Study".to_string()
        }]
    );
    assert!(state.is_watch_active());
}

#[test]
fn second_trigger_while_watching_is_ignored() {
    let (state, _) = update(with_selection(), Msg::AddToCartClicked);
    let (state, effects) = update(state, Msg::BodyClassChanged("sqs-modal-open".to_string()));
    assert!(effects.is_empty());

    let (state, _) = update(state, Msg::ModalWatchFinished { filled: true });
    assert!(!state.is_watch_active());
    let (_, effects) = update(state, Msg::AddToCartClicked);
    assert_eq!(effects.len(), 1);
}

#[test]
fn body_class_change_only_triggers_for_modal_classes() {
    let (state, effects) = update(with_selection(), Msg::BodyClassChanged("loaded".to_string()));
    assert!(effects.is_empty());

    let (_, effects) = update(state, Msg::BodyClassChanged("page lightbox-open".to_string()));
    assert_eq!(
        effects,
        vec![Effect::StartModalWatch {
            value: "Fern Study".to_string()
        }]
    );
}
