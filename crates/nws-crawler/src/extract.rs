use std::collections::HashMap;

use crate::record::{DedupKey, Extracted, Record};
use crate::session::{Field, NavigationSession, SessionError};

/// Reads the dedup key of a listed element without opening anything.
pub fn read_key<S>(session: &mut S, element: &S::Element) -> Result<Option<DedupKey>, SessionError>
where
    S: NavigationSession,
{
    let title = match read_text(session, element, Field::Title)? {
        Some(title) => title,
        None => return Ok(None),
    };
    let date = read_text(session, element, Field::Date)?.unwrap_or_default();
    Ok(Some(DedupKey::new(title, date)))
}

/// Turns one listed element into a record.
///
/// Metadata is read first and the dedup key looked up in `known`: the detail
/// view is only opened for articles nobody has stored yet. Returns `Ok(None)`
/// for an element without a title.
pub fn extract_record<S>(
    session: &mut S,
    element: &S::Element,
    known: &HashMap<DedupKey, Option<String>>,
) -> Result<Option<Extracted>, SessionError>
where
    S: NavigationSession,
{
    let title = match read_text(session, element, Field::Title)? {
        Some(title) => title,
        None => return Ok(None),
    };
    let press = read_text(session, element, Field::Press)?.unwrap_or_default();
    let date = read_text(session, element, Field::Date)?.unwrap_or_default();
    let writer = read_text(session, element, Field::Writer)?.unwrap_or_default();
    let link = read_text(session, element, Field::Link)?.unwrap_or_default();

    let mut record = Record {
        title,
        press,
        date,
        writer,
        summary: None,
        link,
    };

    if let Some(summary) = known.get(&record.key()) {
        log::debug!("Known article, skipping detail view: [{}] {}", record.date, record.title);
        record.summary = summary.clone();
        return Ok(Some(Extracted::Known(record)));
    }

    record.summary = read_detail(session, element)?;
    Ok(Some(Extracted::New(record)))
}

// The detail view is closed whatever happened while reading it, otherwise it
// would cover the list for every following element.
fn read_detail<S>(session: &mut S, element: &S::Element) -> Result<Option<String>, SessionError>
where
    S: NavigationSession,
{
    let content = session.open_detail(element);
    let closed = session.close_detail();

    match (content, closed) {
        (Ok(content), closed) => {
            if let Err(e) = closed {
                log::warn!("Couldn't close detail view got: {e}");
            }
            let content = content.trim();
            Ok((!content.is_empty()).then(|| content.to_string()))
        }
        (Err(e), Err(close_err)) => {
            log::warn!("Couldn't close detail view after failed read got: {close_err}");
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
    }
}

fn read_text<S>(
    session: &mut S,
    element: &S::Element,
    field: Field,
) -> Result<Option<String>, SessionError>
where
    S: NavigationSession,
{
    Ok(session
        .read_field(element, field)?
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty()))
}
