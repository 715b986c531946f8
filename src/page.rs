use crate::formatter::{DateLabeler, PassSummary, SlotError};
use crate::logger::Logger;
use scraper::Html;
use serde::Serialize;
use serde_json::json;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassReport {
    #[serde(flatten)]
    pub summary: PassSummary,
    pub aborted: Option<SlotError>,
}

impl PassReport {
    fn from_result(result: Result<PassSummary, SlotError>, matched: usize) -> Self {
        match result {
            Ok(summary) => Self {
                summary,
                aborted: None,
            },
            Err(error) => Self {
                summary: PassSummary {
                    matched,
                    formatted: error.position,
                    skipped: Vec::new(),
                },
                aborted: Some(error),
            },
        }
    }

    /// `formatted/matched`, as sent in response headers.
    pub fn ratio(&self) -> String {
        format!("{}/{}", self.summary.formatted, self.summary.matched)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageReport {
    pub events: PassReport,
    pub posts: PassReport,
}

#[derive(Debug)]
pub struct LabelledPage {
    pub html: String,
    pub report: PageReport,
}

/// Runs the event pass and then the post pass over one page.
///
/// Nothing is returned as an error: an aborted event pass is logged and
/// recorded in the report, and the post pass still runs.
pub fn label_page(labeler: &DateLabeler, html: &str, logger: &Logger) -> LabelledPage {
    let mut document = Html::parse_document(html);
    let report = label_document(labeler, &mut document, logger);
    LabelledPage {
        html: document.html(),
        report,
    }
}

pub fn label_document(labeler: &DateLabeler, document: &mut Html, logger: &Logger) -> PageReport {
    let matched = labeler.count_event_dates(document);
    let events = PassReport::from_result(labeler.format_event_dates(document), matched);
    log_pass(logger, "events", &events);

    let posts = PassReport::from_result(Ok(labeler.format_post_dates(document)), 0);
    log_pass(logger, "posts", &posts);

    PageReport { events, posts }
}

fn log_pass(logger: &Logger, mode: &str, report: &PassReport) {
    for skipped in &report.summary.skipped {
        logger.warn(
            "labels.node_skipped",
            json!({ "mode": mode, "slot": skipped.slot, "position": skipped.position }),
        );
    }

    match &report.aborted {
        Some(error) => logger.warn(
            "labels.pass_aborted",
            json!({
                "mode": mode,
                "matched": report.summary.matched,
                "formatted": report.summary.formatted,
                "reason": error.to_string(),
            }),
        ),
        None => logger.debug(
            "labels.pass_completed",
            json!({
                "mode": mode,
                "matched": report.summary.matched,
                "formatted": report.summary.formatted,
            }),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::{Slot, SlotPolicy};
    use pretty_assertions::assert_eq;
    use time::UtcOffset;

    const PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>Home</title></head><body>
<section class="event-list">
  <div class="event"><div class="event-date" data-date="2024-03-15"><span class="day"></span><span class="month"></span></div></div>
  <div class="event"><div class="event-date" data-date="2023-12-31"><span class="day"></span><span class="month"></span></div></div>
</section>
<section class="recent-posts">
  <div class="post"><span class="post-date" data-date="2024-03-15"></span></div>
</section>
</body></html>"#;

    fn labeler(policy: SlotPolicy) -> DateLabeler {
        DateLabeler::new(UtcOffset::UTC, policy).unwrap()
    }

    fn logger() -> Logger {
        Logger::new("date-labels-test")
    }

    #[test]
    fn labels_both_card_kinds() {
        let page = label_page(&labeler(SlotPolicy::Abort), PAGE, &logger());

        assert!(page.html.contains(r#"<span class="day">5</span><span class="month">march</span>"#));
        assert!(page.html.contains(r#"<span class="day">0</span><span class="month">december</span>"#));
        assert!(page.html.contains(r#"data-date="2024-03-15">Fri Mar 15 2024</span>"#));
        assert_eq!(page.report.events.ratio(), "2/2");
        assert_eq!(page.report.posts.ratio(), "1/1");
        assert_eq!(page.report.events.aborted, None);
    }

    #[test]
    fn relabelling_is_idempotent() {
        let labeler = labeler(SlotPolicy::Abort);
        let once = label_page(&labeler, PAGE, &logger());
        let twice = label_page(&labeler, &once.html, &logger());

        assert_eq!(twice.html, once.html);
        assert_eq!(twice.report, once.report);
    }

    #[test]
    fn aborted_event_pass_does_not_stop_posts() {
        let page = PAGE.replace(r#"<span class="month"></span></div></div>
  <div"#, r#"</div></div>
  <div"#);
        let labelled = label_page(&labeler(SlotPolicy::Abort), &page, &logger());

        assert_eq!(
            labelled.report.events.aborted,
            Some(SlotError {
                slot: Slot::Month,
                position: 0
            })
        );
        assert_eq!(labelled.report.events.ratio(), "0/2");
        assert!(labelled.html.contains(r#"<span class="day">5</span></div>"#));
        assert!(labelled.html.contains(r#"<span class="day"></span><span class="month"></span>"#));
        assert_eq!(labelled.report.posts.ratio(), "1/1");
        assert!(labelled.html.contains("Fri Mar 15 2024"));
    }

    #[test]
    fn report_serializes_flat() {
        let page = label_page(&labeler(SlotPolicy::Abort), PAGE, &logger());
        let value = serde_json::to_value(&page.report).unwrap();

        assert_eq!(value["events"]["matched"], 2);
        assert_eq!(value["events"]["formatted"], 2);
        assert_eq!(value["posts"]["aborted"], serde_json::Value::Null);
    }
}
