#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Bucket listing finished with the given object keys.
    KeysListed {
        base_url: String,
        prefix: String,
        keys: Vec<String>,
    },
    /// The gallery container carried invalid or missing configuration.
    ConfigRejected(String),
    /// Bucket listing failed; the gallery shows the message inline.
    ListingFailed(String),
    /// User picked the tile at `index`.
    TileSelected { index: usize },
    /// User clicked an add-to-cart control.
    AddToCartClicked,
    /// The page body's class attribute changed.
    BodyClassChanged(String),
    /// A modal watch ended, successfully or not.
    ModalWatchFinished { filled: bool },
    /// Message posted by an embedded frame.
    FrameMessage {
        origin: String,
        key: String,
        value: String,
    },
}
