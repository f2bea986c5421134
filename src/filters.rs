use crate::types::{CalendarEvent, DocumentItem, DocumentType, EventType, Term};

pub const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub const ALL_TERMS: &str = "All";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFilter {
    pub kind: DocumentType,
    pub month: Option<String>,
    pub term: Option<Term>,
}

impl DocumentFilter {
    pub fn of_type(kind: DocumentType) -> Self {
        Self {
            kind,
            month: None,
            term: None,
        }
    }
}

/// Term selection as offered in the reports tab. `All` disables the filter.
pub fn parse_term(value: &str) -> Option<Result<Term, String>> {
    match value {
        ALL_TERMS => None,
        "Term I" => Some(Ok(Term::TermOne)),
        "Term II" => Some(Ok(Term::TermTwo)),
        "Term III" => Some(Ok(Term::TermThree)),
        other => Some(Err(format!("Unknown term: {other}"))),
    }
}

pub fn is_month(value: &str) -> bool {
    MONTHS.contains(&value)
}

/// Documents of the filter's type. A month narrows by the document's month
/// label, a term only narrows reports.
pub fn filter_documents(documents: &[DocumentItem], filter: &DocumentFilter) -> Vec<DocumentItem> {
    documents
        .iter()
        .filter(|doc| doc.kind == filter.kind)
        .filter(|doc| match &filter.month {
            Some(month) => doc.month.as_deref() == Some(month.as_str()),
            None => true,
        })
        .filter(|doc| match (filter.kind, filter.term) {
            (DocumentType::Report, Some(term)) => doc.term == Some(term),
            _ => true,
        })
        .cloned()
        .collect()
}

pub fn events_for_month(events: &[CalendarEvent], month: &str, kind: EventType) -> Vec<CalendarEvent> {
    filter_events(events, Some(month), Some(kind))
}

pub fn filter_events(
    events: &[CalendarEvent],
    month: Option<&str>,
    kind: Option<EventType>,
) -> Vec<CalendarEvent> {
    events
        .iter()
        .filter(|event| kind.map_or(true, |kind| event.kind == kind))
        .filter(|event| month.map_or(true, |month| event.date.format("%B").to_string() == month))
        .cloned()
        .collect()
}
