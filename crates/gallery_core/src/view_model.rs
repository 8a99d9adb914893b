use crate::GalleryStatus;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub status: GalleryStatus,
    pub tiles: Vec<TileView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileView {
    pub title: String,
    pub url: String,
    pub selected: bool,
}
