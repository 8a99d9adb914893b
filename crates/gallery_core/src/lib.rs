//! Gallery core: pure selection state machine and view-model helpers.
mod effect;
mod keys;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use keys::{key_to_title, natural_cmp, object_url};
pub use msg::Msg;
pub use state::{AppState, GalleryStatus, Tile};
pub use update::update;
pub use view_model::{AppViewModel, TileView};
