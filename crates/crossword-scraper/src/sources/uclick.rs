//! Level files shared by the Andrews McMeel puzzle sites (GoComics, Puzzle Society).

use chrono::{NaiveDate, NaiveDateTime};
use url::Url;

use super::{ScrapeContext, ScrapeOutcome};
use crate::error::{ScrapeError, ScrapeResult};
use crate::permissions::permissions_for_urls;
use crate::types::RawPayload;

/// Issue date of a level, or today when the level has none.
pub(crate) fn issue_date(text: &str, format: &str) -> ScrapeResult<NaiveDate> {
    if text.is_empty() {
        return Ok(chrono::Local::now().date_naive());
    }
    NaiveDateTime::parse_from_str(text, format)
        .map(|dt| dt.date())
        .or_else(|_| NaiveDate::parse_from_str(text, format))
        .map_err(|e| ScrapeError::PageData(format!("bad issue date {text:?}: {e}")))
}

/// Fetch the level's puzzle file and wrap it as Uclick XML or Uclick JPZ by its contents.
pub(crate) async fn fetch_level_file(
    ctx: &ScrapeContext<'_>,
    file_url: Option<&str>,
    date: NaiveDate,
) -> ScrapeResult<Vec<ScrapeOutcome>> {
    let Some(file_url) = file_url.filter(|u| !u.is_empty()) else {
        return Ok(ScrapeOutcome::error("No file found in level data").into());
    };
    let parsed = Url::parse(file_url).map_err(|e| ScrapeError::invalid_url(file_url, e))?;
    let needed = permissions_for_urls([&parsed]);
    if !ctx.has_permissions(&needed).await {
        return Ok(ScrapeOutcome::need_permissions(needed).into());
    }

    let xml = ctx.fetch_text(file_url, &[]).await?;
    if xml.is_empty() {
        return Ok(ScrapeOutcome::error("Could not fetch puzzle XML").into());
    }
    let payload = if xml.contains("<crossword-compiler") {
        RawPayload::UclickJpz { xml, date }
    } else {
        RawPayload::UclickXml { xml, date }
    };
    Ok(ScrapeOutcome::found(payload).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_date_formats() {
        assert_eq!(
            issue_date("2024-03-01T00:00:00", "%Y-%m-%dT%H:%M:%S").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert_eq!(
            issue_date("2024-03-01", "%Y-%m-%d").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert!(issue_date("March 1", "%Y-%m-%d").is_err());
    }
}
