use crate::dates::{ParsedDate, parse_date_attribute};
use ego_tree::NodeId;
use scraper::node::Text;
use scraper::{ElementRef, Html, Node, Selector};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use time::UtcOffset;

pub const EVENT_DATE_SELECTOR: &str = ".event-list .event .event-date";
pub const POST_DATE_SELECTOR: &str = ".recent-posts .post .post-date";
pub const DAY_SLOT_SELECTOR: &str = ".day";
pub const MONTH_SLOT_SELECTOR: &str = ".month";
pub const DATE_ATTRIBUTE: &str = "data-date";

#[derive(Debug, Error)]
pub enum LabelerError {
    #[error("invalid selector `{selector}`: {reason}")]
    Selector { selector: &'static str, reason: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Day,
    Month,
}

impl Slot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Day => "day",
            Slot::Month => "month",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event date node without one of its label slots.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize)]
#[error("event date #{position} has no `{slot}` slot")]
pub struct SlotError {
    pub slot: Slot,
    /// Zero-based position of the node among the pass's matches.
    pub position: usize,
}

/// What happens to the rest of an event pass when a card lacks a slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotPolicy {
    /// Stop the pass at the broken card. Later cards keep their markup.
    #[default]
    Abort,
    /// Leave the broken card as far as it got and continue with the next.
    Skip,
}

impl FromStr for SlotPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(SlotPolicy::Abort),
            "skip" => Ok(SlotPolicy::Skip),
            other => Err(format!("unknown missing-slot policy `{other}`")),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassSummary {
    pub matched: usize,
    pub formatted: usize,
    pub skipped: Vec<SlotError>,
}

/// Rewrites event and post date nodes of a parsed page.
#[derive(Debug)]
pub struct DateLabeler {
    event_dates: Selector,
    post_dates: Selector,
    day_slot: Selector,
    month_slot: Selector,
    host_offset: UtcOffset,
    on_missing_slot: SlotPolicy,
}

impl DateLabeler {
    pub fn new(host_offset: UtcOffset, on_missing_slot: SlotPolicy) -> Result<Self, LabelerError> {
        Ok(Self {
            event_dates: compile(EVENT_DATE_SELECTOR)?,
            post_dates: compile(POST_DATE_SELECTOR)?,
            day_slot: compile(DAY_SLOT_SELECTOR)?,
            month_slot: compile(MONTH_SLOT_SELECTOR)?,
            host_offset,
            on_missing_slot,
        })
    }

    pub fn count_event_dates(&self, document: &Html) -> usize {
        document.select(&self.event_dates).count()
    }

    /// Writes the weekday index into `.day` and the month name into
    /// `.month` of every event date node, in document order.
    ///
    /// With [`SlotPolicy::Abort`] the first card missing a slot ends the
    /// pass with an error. Writes made before it, including the `.day`
    /// write of that same card, are kept.
    pub fn format_event_dates(&self, document: &mut Html) -> Result<PassSummary, SlotError> {
        let targets = matched_ids(document, &self.event_dates);
        let mut summary = PassSummary {
            matched: targets.len(),
            ..PassSummary::default()
        };

        for (position, id) in targets.into_iter().enumerate() {
            match self.label_event(document, id, position) {
                Ok(()) => summary.formatted += 1,
                Err(error) => match self.on_missing_slot {
                    SlotPolicy::Abort => return Err(error),
                    SlotPolicy::Skip => summary.skipped.push(error),
                },
            }
        }

        Ok(summary)
    }

    /// Replaces the content of every post date node with its full date
    /// string.
    pub fn format_post_dates(&self, document: &mut Html) -> PassSummary {
        let targets = matched_ids(document, &self.post_dates);
        let matched = targets.len();

        for id in targets {
            let date = self.read_date(document, id);
            replace_text(document, id, &date.date_string());
        }

        PassSummary {
            matched,
            formatted: matched,
            skipped: Vec::new(),
        }
    }

    fn label_event(&self, document: &mut Html, id: NodeId, position: usize) -> Result<(), SlotError> {
        let date = self.read_date(document, id);

        let day = find_slot(document, id, &self.day_slot).ok_or(SlotError {
            slot: Slot::Day,
            position,
        })?;
        replace_text(document, day, &date.weekday_label());

        let month = find_slot(document, id, &self.month_slot).ok_or(SlotError {
            slot: Slot::Month,
            position,
        })?;
        replace_text(document, month, date.month_label());

        Ok(())
    }

    fn read_date(&self, document: &Html, id: NodeId) -> ParsedDate {
        let raw = element(document, id).and_then(|element| element.value().attr(DATE_ATTRIBUTE));
        parse_date_attribute(raw, self.host_offset)
    }
}

fn compile(selector: &'static str) -> Result<Selector, LabelerError> {
    Selector::parse(selector).map_err(|error| LabelerError::Selector {
        selector,
        reason: error.to_string(),
    })
}

fn element(document: &Html, id: NodeId) -> Option<ElementRef<'_>> {
    document.tree.get(id).and_then(ElementRef::wrap)
}

fn matched_ids(document: &Html, selector: &Selector) -> Vec<NodeId> {
    document.select(selector).map(|element| element.id()).collect()
}

/// First descendant of `id` matching `selector`, excluding `id` itself.
fn find_slot(document: &Html, id: NodeId, selector: &Selector) -> Option<NodeId> {
    element(document, id)?
        .select(selector)
        .map(|slot| slot.id())
        .find(|slot| *slot != id)
}

fn replace_text(document: &mut Html, id: NodeId, text: &str) {
    let Some(mut node) = document.tree.get_mut(id) else {
        return;
    };
    while let Some(mut child) = node.first_child() {
        child.detach();
    }
    node.append(Node::Text(Text { text: text.into() }));
}
