use gallery_logging::{gallery_debug, gallery_warn};

use crate::matcher::FieldMatcher;
use crate::page::{Page, PageError};

/// Writes `value` into the best control of every active scope (document and
/// open modals) and returns how many controls were written.
pub async fn fill_all_scopes(
    page: &dyn Page,
    matcher: &FieldMatcher,
    value: &str,
) -> Result<usize, PageError> {
    if value.trim().is_empty() {
        gallery_warn!("Refusing to fill fields with an empty value");
        return Ok(0);
    }

    let html = page.snapshot().await?;
    // Parsed documents are not Send; only owned candidates cross the await below.
    let targets = matcher.targets(&html);

    let mut filled = 0;
    for target in targets {
        if page.set_value(&target.locator, value).await? {
            gallery_debug!(
                "Set field value name={:?} tag={} type={} score={}",
                target.name,
                target.tag,
                target.kind,
                target.score
            );
            filled += 1;
        }
    }
    gallery_debug!("Filled {} field(s) with {:?}", filled, value);
    Ok(filled)
}
