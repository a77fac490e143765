//! Canonicalisation of raw input fields.
//!
//! Every function here is pure: the same input string always yields the same
//! output. Nothing reads the wall clock. Bad input never fails; an
//! unparseable date becomes [`EPOCH_SENTINEL`] so downstream consumers can
//! flag it.

use chrono::{
  DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc,
};
use url::Url;

/// Query parameters removed from every canonical URL.
pub const TRACKING_PARAMS: [&str; 3] = ["utm_source", "utm_medium", "utm_campaign"];

/// Canonical form of a missing or unparseable date.
pub const EPOCH_SENTINEL: &str = "1970-01-01T00:00:00.000Z";

/// Source label used when a URL has no host.
pub const FALLBACK_SOURCE: &str = "demo";

// ─── Title ───────────────────────────────────────────────────────────────────

/// Trim a title. `None` when nothing is left; the caller must reject the row.
pub fn canonical_title(raw: &str) -> Option<String> {
  let t = raw.trim();
  (!t.is_empty()).then(|| t.to_owned())
}

// ─── URL ─────────────────────────────────────────────────────────────────────

/// Strip the fragment and the tracking parameters from `raw`.
///
/// If `raw` does not parse as an absolute URL it is returned unchanged. The
/// query string is only re-serialised when a tracking parameter was actually
/// present, so an already-canonical URL round-trips byte for byte.
pub fn canonical_url(raw: &str) -> String {
  let Ok(mut url) = Url::parse(raw) else {
    return raw.to_owned();
  };
  url.set_fragment(None);

  let is_tracking = |k: &str| TRACKING_PARAMS.contains(&k);
  if url.query_pairs().any(|(k, _)| is_tracking(&k)) {
    let kept: Vec<(String, String)> = url
      .query_pairs()
      .filter(|(k, _)| !is_tracking(k))
      .map(|(k, v)| (k.into_owned(), v.into_owned()))
      .collect();
    if kept.is_empty() {
      url.set_query(None);
    } else {
      url.query_pairs_mut().clear().extend_pairs(kept);
    }
  }

  url.into()
}

/// The receipt `source`: the URL's host (with port, if any), or
/// [`FALLBACK_SOURCE`] when there is none.
pub fn source_label(url: &str) -> String {
  Url::parse(url)
    .ok()
    .and_then(|u| {
      u.host_str().map(|h| match u.port() {
        Some(p) => format!("{h}:{p}"),
        None => h.to_owned(),
      })
    })
    .unwrap_or_else(|| FALLBACK_SOURCE.to_owned())
}

// ─── Dates ───────────────────────────────────────────────────────────────────

/// The sentinel instant, `1970-01-01T00:00:00Z`.
pub fn epoch() -> DateTime<Utc> { DateTime::<Utc>::UNIX_EPOCH }

/// Normalise a date-like string to UTC midnight.
///
/// - `YYYY-MM` → the first day of that month.
/// - Anything else that parses as a date or date-time → that UTC calendar
///   day.
/// - Empty, unparseable, or a year outside `0000..=9999` → [`epoch`].
pub fn canonical_published_at(raw: &str) -> DateTime<Utc> {
  let t = raw.trim();
  if t.is_empty() {
    return epoch();
  }
  year_month(t)
    .or_else(|| parse_calendar_day(t))
    .filter(|day| ISO_YEARS.contains(&day.year()))
    .map(midnight)
    .unwrap_or_else(epoch)
}

/// Years that render as four digits in [`format_iso`].
const ISO_YEARS: std::ops::RangeInclusive<i32> = 0..=9999;

/// Render an instant the way every producer must: millisecond precision with
/// a `Z` suffix, e.g. `2024-03-01T00:00:00.000Z`.
pub fn format_iso(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn midnight(day: NaiveDate) -> DateTime<Utc> {
  Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN))
}

/// `YYYY-MM` with a real month. `2024-13` is not a month.
fn year_month(t: &str) -> Option<NaiveDate> {
  let (y, m) = t.split_once('-')?;
  let digits = |s: &str, n: usize| s.len() == n && s.bytes().all(|b| b.is_ascii_digit());
  if !digits(y, 4) || !digits(m, 2) {
    return None;
  }
  NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, 1)
}

const NAIVE_DATETIME_FORMATS: &[&str] = &[
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y-%m-%d %H:%M:%S%.f",
  "%Y-%m-%dT%H:%M",
  "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &[
  "%Y-%m-%d",
  "%Y/%m/%d",
  "%m/%d/%Y",
  "%B %d, %Y",
  "%b %d, %Y",
  "%d %B %Y",
  "%d %b %Y",
  "%B %d %Y",
  "%b %d %Y",
];

/// Best-effort general date parsing. Offsets are honoured; naive timestamps
/// are taken as UTC.
fn parse_calendar_day(t: &str) -> Option<NaiveDate> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
    return Some(dt.with_timezone(&Utc).date_naive());
  }
  if let Ok(dt) = DateTime::parse_from_rfc2822(t) {
    return Some(dt.with_timezone(&Utc).date_naive());
  }
  if let Some(dt) = NAIVE_DATETIME_FORMATS
    .iter()
    .find_map(|f| NaiveDateTime::parse_from_str(t, f).ok())
  {
    return Some(dt.date());
  }
  if let Some(d) = DATE_FORMATS
    .iter()
    .find_map(|f| NaiveDate::parse_from_str(t, f).ok())
  {
    return Some(d);
  }
  // A bare year means January 1st of that year.
  if t.len() == 4 && t.bytes().all(|b| b.is_ascii_digit()) {
    return NaiveDate::from_ymd_opt(t.parse().ok()?, 1, 1);
  }
  None
}
