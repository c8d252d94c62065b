pub mod cascade;
pub mod details;

use tracing::debug;

use crate::ids::Clock;
use crate::model::{ScrapeInput, ScrapeResult};

pub use cascade::{extract_demo, locate_demo, Located};

/// First pass over a scraped record: details, description and demo payload.
pub fn clean_record(input: &ScrapeInput, clock: &dyn Clock) -> ScrapeResult {
    clean_record_traced(input, clock).0
}

/// Like [`clean_record`], also returning the cascade strategy that produced
/// the demo, if any.
pub fn clean_record_traced(
    input: &ScrapeInput,
    clock: &dyn Clock,
) -> (ScrapeResult, Option<&'static str>) {
    let mut result = ScrapeResult {
        url: input.url.clone(),
        status: input.status.clone(),
        details: present(&input.workflow_details).map(details::extract),
        description: present(&input.workflow_description).map(details::description),
        demo: None,
        demo_kind: None,
        has_demo: None,
    };

    let mut strategy = None;
    if let Some(html) = present(&input.workflow_demo) {
        match locate_demo(html, clock) {
            Some(found) => {
                strategy = Some(found.strategy);
                result.demo_kind = Some(found.demo.kind());
                result.demo = Some(found.demo);
            }
            None => {
                debug!(url = %input.url, "demo html present but no payload found");
                result.has_demo = Some(true);
            }
        }
    }

    (result, strategy)
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}
