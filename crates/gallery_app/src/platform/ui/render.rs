use std::fmt::Write;

use gallery_core::{AppViewModel, GalleryStatus, TileView};

use super::constants::*;

/// Renders the gallery container: one wrapper per tile, or an inline message
/// while loading, on failure, or when nothing was listed.
pub fn render(container_id: &str, style: Option<&str>, view: &AppViewModel) -> String {
    let mut out = String::new();
    let _ = write!(out, "<div id=\"{}\"", escape(container_id));
    if let Some(style) = style {
        let _ = write!(out, " style=\"{}\"", escape(style));
    }
    out.push('>');

    match &view.status {
        GalleryStatus::Loading => push_message(&mut out, LOADING_TEXT),
        GalleryStatus::Empty => push_message(&mut out, EMPTY_TEXT),
        GalleryStatus::Failed(message) => push_message(&mut out, message),
        GalleryStatus::Ready => {
            for tile in &view.tiles {
                push_tile(&mut out, tile);
            }
        }
    }

    out.push_str("</div>\n");
    out
}

fn push_message(out: &mut String, text: &str) {
    let _ = write!(out, "<p class=\"{MESSAGE_CLASS}\">{}</p>", escape(text));
}

fn push_tile(out: &mut String, tile: &TileView) {
    let name = escape(&tile.title);
    let url = escape(&tile.url);
    let wrapper_class = if tile.selected {
        format!("{WRAPPER_CLASS} {SELECTED_CLASS}")
    } else {
        WRAPPER_CLASS.to_string()
    };

    let _ = write!(
        out,
        "<div class=\"{wrapper_class}\" data-name=\"{name}\">\
         <div class=\"{ITEM_CLASS}\" role=\"button\" tabindex=\"0\" title=\"{name}\">\
         <img alt=\"{name}\" loading=\"lazy\" decoding=\"async\" data-src=\"{url}\">\
         <span class=\"{SCREEN_READER_CLASS}\">{name}</span></div>\
         <div class=\"{LABEL_CLASS}\">{name}</div>"
    );
    if tile.selected {
        let _ = write!(out, "<span class=\"{BADGE_CLASS}\">{SELECTED_BADGE_TEXT}</span>");
    }
    out.push_str("</div>");
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn view(status: GalleryStatus, tiles: Vec<TileView>) -> AppViewModel {
        AppViewModel { status, tiles }
    }

    fn tile(title: &str, selected: bool) -> TileView {
        TileView {
            title: title.to_string(),
            url: format!("https://b.s3.amazonaws.com/prints/{title}.jpg"),
            selected,
        }
    }

    #[test]
    fn tiles_are_lazy_and_selection_gets_badge() {
        let html = render(
            "fabric-gallery",
            Some("--fg-gap:14px"),
            &view(
                GalleryStatus::Ready,
                vec![tile("Rose", false), tile("Tulip", true)],
            ),
        );

        assert!(html.starts_with("<div id=\"fabric-gallery\" style=\"--fg-gap:14px\">"));
        assert_eq!(html.matches("class=\"fg-item-wrapper").count(), 2);
        assert_eq!(html.matches("loading=\"lazy\"").count(), 2);
        assert_eq!(html.matches("decoding=\"async\"").count(), 2);
        assert!(html.contains("data-src=\"https://b.s3.amazonaws.com/prints/Rose.jpg\""));
        assert!(html.contains("class=\"fg-item-wrapper fg-selected\" data-name=\"Tulip\""));
        assert_eq!(html.matches("fg-selected-badge").count(), 1);
        assert!(!html.contains(" src=\""));
    }

    #[test]
    fn failures_and_empty_listing_render_inline_text() {
        let failed = render(
            "g",
            None,
            &view(
                GalleryStatus::Failed("Could not load gallery. S3 error: AccessDenied - Access Denied".into()),
                Vec::new(),
            ),
        );
        assert_eq!(
            failed,
            "<div id=\"g\"><p class=\"fg-message\">Could not load gallery. S3 error: AccessDenied - Access Denied</p></div>\n"
        );

        let empty = render("g", None, &view(GalleryStatus::Empty, Vec::new()));
        assert!(empty.contains(">No images found<"));
    }

    #[test]
    fn titles_are_escaped() {
        let html = render(
            "g",
            None,
            &view(GalleryStatus::Ready, vec![tile("Salt & \"Pepper\"", false)]),
        );
        assert!(html.contains("data-name=\"Salt &amp; &quot;Pepper&quot;\""));
        assert!(!html.contains("Salt & "));
    }
}
