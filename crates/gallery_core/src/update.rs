use gallery_logging::{gallery_debug, gallery_info, gallery_warn};

use crate::{AppState, Effect, Msg};

/// Body class words that mean a storefront modal has opened.
const MODAL_CLASS_WORDS: &[&str] = &["modal", "lightbox"];

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::KeysListed {
            base_url,
            prefix,
            keys,
        } => {
            state.load_tiles(&base_url, &prefix, keys);
            Vec::new()
        }
        Msg::ConfigRejected(message) => {
            state.fail(format!("Configuration error: {message}"));
            Vec::new()
        }
        Msg::ListingFailed(message) => {
            state.fail(format!("Could not load gallery. {message}"));
            Vec::new()
        }
        Msg::TileSelected { index } => match state.select_tile(index) {
            Some(tile) => {
                gallery_info!("Tile selected: {}", tile.title);
                vec![
                    Effect::FillFields {
                        value: tile.title.clone(),
                    },
                    Effect::OpenPreview {
                        url: tile.url.clone(),
                        caption: tile.title.clone(),
                    },
                ]
            }
            None => {
                gallery_warn!("Ignoring selection of unknown tile {}", index);
                Vec::new()
            }
        },
        Msg::AddToCartClicked => start_modal_watch(&mut state),
        Msg::BodyClassChanged(class) => {
            if class_suggests_modal(&class) {
                start_modal_watch(&mut state)
            } else {
                Vec::new()
            }
        }
        Msg::ModalWatchFinished { filled } => {
            gallery_debug!("Modal watch finished, filled={}", filled);
            state.finish_watch();
            Vec::new()
        }
        Msg::FrameMessage { origin, key, value } => {
            if state.is_origin_allowed(&origin) {
                vec![Effect::PersistEntry { key, value }]
            } else {
                gallery_warn!("Dropping frame message for key {} from origin {}", key, origin);
                Vec::new()
            }
        }
    };

    (state, effects)
}

fn start_modal_watch(state: &mut AppState) -> Vec<Effect> {
    let Some(value) = state.selected_name().map(ToOwned::to_owned) else {
        gallery_warn!("Modal fill skipped: nothing selected");
        return Vec::new();
    };
    if !state.begin_watch() {
        gallery_debug!("Modal watch already running");
        return Vec::new();
    }
    vec![Effect::StartModalWatch { value }]
}

fn class_suggests_modal(class: &str) -> bool {
    class
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .any(|word| {
            MODAL_CLASS_WORDS
                .iter()
                .any(|marker| marker.eq_ignore_ascii_case(word))
        })
}
