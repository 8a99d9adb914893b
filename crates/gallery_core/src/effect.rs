/// Side effects requested by [`crate::update`]; the platform layer runs them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Write `value` into the best matching field of every active scope.
    FillFields { value: String },
    /// Show the full-size preview overlay for a tile.
    OpenPreview { url: String, caption: String },
    /// Keep filling until a modal field appears or the watch window closes.
    StartModalWatch { value: String },
    /// Persist a relayed key/value pair into the durable store.
    PersistEntry { key: String, value: String },
}
