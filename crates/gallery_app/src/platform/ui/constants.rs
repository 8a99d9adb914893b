pub const WRAPPER_CLASS: &str = "fg-item-wrapper";
pub const ITEM_CLASS: &str = "fg-item";
pub const SELECTED_CLASS: &str = "fg-selected";
pub const SCREEN_READER_CLASS: &str = "fg-sr";
pub const LABEL_CLASS: &str = "fg-label";
pub const BADGE_CLASS: &str = "fg-selected-badge";
pub const MESSAGE_CLASS: &str = "fg-message";

pub const LOADING_TEXT: &str = "Loading gallery…";
pub const EMPTY_TEXT: &str = "No images found";
pub const SELECTED_BADGE_TEXT: &str = "Selected";
