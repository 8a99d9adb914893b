use crate::keys::{key_to_title, natural_cmp, object_url};
use crate::view_model::{AppViewModel, TileView};

/// One gallery entry derived from a listed object key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub key: String,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GalleryStatus {
    #[default]
    Loading,
    Ready,
    Empty,
    /// Inline message shown in place of the grid.
    Failed(String),
}

/// Application state shared by the gallery, the fill routine and the modal
/// watcher. The selected name is only reachable through accessors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    status: GalleryStatus,
    tiles: Vec<Tile>,
    selected_tile: Option<usize>,
    selected_name: Option<String>,
    allowed_origins: Vec<String>,
    watch_active: bool,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State that accepts frame messages from the listed origins only.
    pub fn with_allowed_origins<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_origins: origins
                .into_iter()
                .map(|origin| origin.into().trim_end_matches('/').to_string())
                .collect(),
            ..Self::default()
        }
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            status: self.status.clone(),
            tiles: self
                .tiles
                .iter()
                .enumerate()
                .map(|(index, tile)| TileView {
                    title: tile.title.clone(),
                    url: tile.url.clone(),
                    selected: self.selected_tile == Some(index),
                })
                .collect(),
        }
    }

    pub fn status(&self) -> &GalleryStatus {
        &self.status
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Name most recently selected by the user, if any.
    pub fn selected_name(&self) -> Option<&str> {
        self.selected_name.as_deref()
    }

    pub fn is_watch_active(&self) -> bool {
        self.watch_active
    }

    /// Returns whether the state changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn load_tiles(&mut self, base_url: &str, prefix: &str, keys: Vec<String>) {
        let mut tiles: Vec<Tile> = keys
            .into_iter()
            .map(|key| Tile {
                title: key_to_title(&key, prefix),
                url: object_url(base_url, &key),
                key,
            })
            .collect();
        tiles.sort_by(|a, b| natural_cmp(&a.key, &b.key));

        self.status = if tiles.is_empty() {
            GalleryStatus::Empty
        } else {
            GalleryStatus::Ready
        };
        self.tiles = tiles;
        self.selected_tile = None;
        self.mark_dirty();
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.status = GalleryStatus::Failed(message);
        self.tiles.clear();
        self.selected_tile = None;
        self.mark_dirty();
    }

    /// Marks the tile at `index` selected and returns it; out-of-range
    /// indices leave the selection untouched.
    pub(crate) fn select_tile(&mut self, index: usize) -> Option<&Tile> {
        let title = self.tiles.get(index)?.title.clone();
        self.selected_tile = Some(index);
        self.selected_name = Some(title);
        self.mark_dirty();
        self.tiles.get(index)
    }

    /// Claims the single modal-watch slot; false if one is already running.
    pub(crate) fn begin_watch(&mut self) -> bool {
        if self.watch_active {
            return false;
        }
        self.watch_active = true;
        self.mark_dirty();
        true
    }

    pub(crate) fn finish_watch(&mut self) {
        if self.watch_active {
            self.watch_active = false;
            self.mark_dirty();
        }
    }

    pub(crate) fn is_origin_allowed(&self, origin: &str) -> bool {
        let origin = origin.trim_end_matches('/');
        self.allowed_origins
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(origin))
    }
}
