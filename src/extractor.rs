//! Rendered listing page -> flight records.
//!
//! Everything here is a pure function of the HTML string. `scraper::Html` is
//! not `Send`, so callers must finish extracting before their next `.await`.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

use crate::flights::ScrapedFlight;
use crate::geo::GeoPoint;
use crate::gliders::NewGlider;
use crate::pilots::NewPilot;
use crate::takeoffs::NewTakeoff;

/// Rows per listing page; pager offsets advance in these steps
pub const PAGE_SIZE: u32 = 100;

static ROW_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#flights table tbody tr").unwrap());
static FLAG_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("span.cic").unwrap());
static TITLED_DIV_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("div[title]").unwrap());
static EM_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("em").unwrap());
static STRONG_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("strong").unwrap());
static AIRTIME_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("span.d1").unwrap());
static DETAIL_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a.detail").unwrap());
static PAGER_LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".XCpager a[href]").unwrap());
static OPTION_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("select option[value]").unwrap());

static POINT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"filter\[point\]=([-\d.]+)(?:\s|%20|\+)+([-\d.]+)").unwrap());
static AIRTIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*:\s*(\d{2})").unwrap());
static START_OFFSET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[start\]=(\d+)").unwrap());
static ISO_DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    /// A world listing row whose takeoff cell has no country flag. The page is
    /// no longer laid out the way the extractor expects.
    #[error("listing row {row} has no takeoff country flag")]
    MissingFlag { row: usize },
}

/// Which flavour of listing a page comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingVariant {
    /// Site-wide listing; pilot and takeoff cells lead with a country flag
    World,
    /// National listing; no flags
    Regional,
}

impl ListingVariant {
    /// Best-effort guess for targets whose variant isn't configured
    pub fn from_url(url: &str) -> Self {
        if url.contains("/world/") {
            ListingVariant::World
        } else {
            ListingVariant::Regional
        }
    }

    pub fn layout(self) -> &'static ColumnLayout {
        match self {
            ListingVariant::World => &WORLD_LAYOUT,
            ListingVariant::Regional => &REGIONAL_LAYOUT,
        }
    }
}

impl std::fmt::Display for ListingVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListingVariant::World => write!(f, "world"),
            ListingVariant::Regional => write!(f, "regional"),
        }
    }
}

/// Cell positions within a listing row. `*_link` fields index the element
/// children of the cell's wrapping `<div>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub id: usize,
    pub start: usize,
    pub pilot: usize,
    pub pilot_link: usize,
    pub takeoff: usize,
    pub takeoff_link: usize,
    pub category: usize,
    pub distance: usize,
    pub score: usize,
    pub airtime: usize,
    pub glider: usize,
    pub detail: usize,
    /// Takeoff cells carry a `span.cic.flag_<cc>` country marker
    pub flagged: bool,
}

pub const WORLD_LAYOUT: ColumnLayout = ColumnLayout {
    id: 0,
    start: 1,
    pilot: 2,
    pilot_link: 1,
    takeoff: 3,
    takeoff_link: 1,
    category: 4,
    distance: 5,
    score: 6,
    airtime: 7,
    glider: 8,
    detail: 10,
    flagged: true,
};

pub const REGIONAL_LAYOUT: ColumnLayout = ColumnLayout {
    pilot_link: 0,
    takeoff_link: 0,
    flagged: false,
    ..WORLD_LAYOUT
};

/// Everything the extractor needs to know about the page besides its HTML
#[derive(Debug, Clone)]
pub struct ListingContext {
    pub variant: ListingVariant,
    /// Lowercase country code matched against `flag_<cc>`, e.g. "ro"
    pub region: String,
    /// Zone the listing shows local start times in
    pub tz: Tz,
}

impl ListingContext {
    pub fn new(variant: ListingVariant, region: &str, tz: Tz) -> Self {
        Self {
            variant,
            region: region.to_lowercase(),
            tz,
        }
    }
}

/// Parse every flight row on a listing page.
///
/// Malformed rows are dropped one by one. A page without the listing container
/// gives an empty result. World rows outside the region are skipped; a world row
/// without a flag fails the whole page.
pub fn extract_flights(html: &str, ctx: &ListingContext) -> Result<Vec<ScrapedFlight>, ExtractError> {
    let document = Html::parse_document(html);
    let layout = ctx.variant.layout();

    let mut flights = Vec::new();
    for (index, row) in document.select(&ROW_SELECTOR).enumerate() {
        let cells = row_cells(row);

        // Placeholder and separator rows span the table in a single cell
        if cells.len() <= layout.detail {
            metrics::counter!("xc2db.extractor.rows_dropped_total").increment(1);
            debug!(row = index, cells = cells.len(), "Dropping listing row without flight cells");
            continue;
        }

        if layout.flagged && !takeoff_flag_matches(&cells, layout, &ctx.region, index)? {
            continue;
        }

        match parse_row(&cells, layout, ctx.tz) {
            Ok(flight) => flights.push(flight),
            Err(reason) => {
                metrics::counter!("xc2db.extractor.rows_dropped_total").increment(1);
                debug!(row = index, reason, "Dropping malformed listing row");
            }
        }
    }

    Ok(flights)
}

/// Whether a world listing row's takeoff flag is `flag_<region>`
pub fn is_takeoff_in_region(row: ElementRef<'_>, region: &str) -> Result<bool, ExtractError> {
    takeoff_flag_matches(&row_cells(row), &WORLD_LAYOUT, &region.to_lowercase(), 0)
}

fn takeoff_flag_matches(
    cells: &[ElementRef<'_>],
    layout: &ColumnLayout,
    region: &str,
    row: usize,
) -> Result<bool, ExtractError> {
    let flag = cells
        .get(layout.takeoff)
        .and_then(|cell| cell.select(&FLAG_SELECTOR).next())
        .ok_or(ExtractError::MissingFlag { row })?;

    let wanted = format!("flag_{region}");
    Ok(flag
        .value()
        .classes()
        .any(|class| class.eq_ignore_ascii_case(&wanted)))
}

/// Highest `[start]=N` offset among the pager links; 0 when there is no pager
pub fn extract_last_offset(html: &str) -> u32 {
    let document = Html::parse_document(html);
    document
        .select(&PAGER_LINK_SELECTOR)
        .filter_map(|link| link.value().attr("href"))
        .flat_map(|href| START_OFFSET_RE.captures_iter(href))
        .filter_map(|caps| caps[1].parse::<u32>().ok())
        .max()
        .unwrap_or(0)
}

/// Dates offered by the listing's day filter, in page order, without repeats.
/// Option values look like "2025-09-30" or "2025-09-30 [10]"; options of other
/// selects (season pickers and the like) are ignored.
pub fn extract_available_dates(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut dates = Vec::new();

    for option in document.select(&OPTION_SELECTOR) {
        let Some(value) = option.value().attr("value") else {
            continue;
        };
        let Some(token) = value.split_whitespace().next() else {
            continue;
        };
        if ISO_DATE_RE.is_match(token) && seen.insert(token.to_string()) {
            dates.push(token.to_string());
        }
    }

    dates
}

/// Listing URL for one page of a task. Filters live in the fragment, joined by
/// `@`; the date filter is only added when present and the offset only past
/// the first page.
pub fn listing_url(base: &str, date: Option<&str>, offset: u32) -> String {
    let mut url = base.to_string();
    let mut params = Vec::new();
    if let Some(date) = date.filter(|d| !d.is_empty()) {
        params.push(format!("filter[date]={date}"));
    }
    if offset > 0 {
        params.push(format!("flights[start]={offset}"));
    }
    if params.is_empty() {
        return url;
    }

    match url.find('#') {
        None => url.push('#'),
        Some(pos) if pos + 1 < url.len() && !url.ends_with('@') => url.push('@'),
        Some(_) => {}
    }
    url.push_str(&params.join("@"));
    url
}

fn row_cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "td")
        .collect()
}

fn cell<'a>(cells: &[ElementRef<'a>], index: usize) -> Result<ElementRef<'a>, &'static str> {
    cells.get(index).copied().ok_or("missing cell")
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// The `index`-th element child of the cell's first `<div>`, if it is a link
fn cell_link(cell: ElementRef<'_>, index: usize) -> Option<ElementRef<'_>> {
    let wrapper = cell
        .children()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "div")?;
    wrapper
        .children()
        .filter_map(ElementRef::wrap)
        .nth(index)
        .filter(|el| el.value().name() == "a")
}

fn parse_row(
    cells: &[ElementRef<'_>],
    layout: &ColumnLayout,
    tz: Tz,
) -> Result<ScrapedFlight, &'static str> {
    let id = parse_flight_id(cell(cells, layout.id)?).ok_or("flight id")?;
    let start_time = parse_start_time(cell(cells, layout.start)?, tz).ok_or("start time")?;

    let pilot_link = cell_link(cell(cells, layout.pilot)?, layout.pilot_link).ok_or("pilot link")?;
    let pilot = NewPilot {
        name: text_of(pilot_link),
        username: pilot_link
            .value()
            .attr("href")
            .and_then(username_from_href)
            .ok_or("pilot username")?,
    };
    if pilot.name.is_empty() {
        return Err("pilot name");
    }

    let takeoff_link =
        cell_link(cell(cells, layout.takeoff)?, layout.takeoff_link).ok_or("takeoff link")?;
    let start_point = takeoff_link
        .value()
        .attr("href")
        .and_then(parse_point)
        .ok_or("takeoff point")?;
    let takeoff = NewTakeoff {
        name: takeoff_name(takeoff_link).ok_or("takeoff name")?,
        centroid: start_point,
    };

    let category = cell(cells, layout.category)?
        .select(&TITLED_DIV_SELECTOR)
        .next()
        .and_then(|div| div.value().attr("title"))
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
        .ok_or("category")?;

    let distance_km = parse_strong_number(cell(cells, layout.distance)?).ok_or("distance")?;
    let score = parse_strong_number(cell(cells, layout.score)?).ok_or("score")?;
    let airtime_minutes = parse_airtime(cell(cells, layout.airtime)?).ok_or("airtime")?;
    let glider = parse_glider(cell(cells, layout.glider)?).ok_or("glider")?;

    let url = cell(cells, layout.detail)?
        .select(&DETAIL_SELECTOR)
        .next()
        .and_then(|link| link.value().attr("href"))
        .map(str::to_string)
        .ok_or("detail url")?;

    Ok(ScrapedFlight {
        id,
        pilot,
        takeoff,
        start_time,
        start_point,
        category,
        distance_km,
        score,
        airtime_minutes,
        glider,
        url,
    })
}

fn parse_flight_id(cell: ElementRef<'_>) -> Option<i64> {
    let title = cell.value().attr("title")?;
    let id: i64 = title.trim().strip_prefix("FLID:")?.trim().parse().ok()?;
    (id > 0).then_some(id)
}

/// "09.08.23 <em>12:42</em>" in the listing's zone -> UTC instant.
/// Anything after the time (e.g. a UTC offset badge) is ignored.
fn parse_start_time(cell: ElementRef<'_>, tz: Tz) -> Option<DateTime<Utc>> {
    let text = text_of(cell);
    let mut tokens = text.split_whitespace();
    let date = tokens.next()?;
    let time = match cell.select(&EM_SELECTOR).next() {
        Some(em) => text_of(em),
        None => tokens.next()?.to_string(),
    };
    let naive = NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%d.%m.%y %H:%M").ok()?;
    // Nonexistent local times (spring-forward gap) have no instant
    let local = tz.from_local_datetime(&naive).earliest()?;
    Some(local.with_timezone(&Utc))
}

fn username_from_href(href: &str) -> Option<String> {
    let (_, rest) = href.split_once("detail:")?;
    let username = rest.split(['/', '?', '#']).next()?.trim();
    (!username.is_empty()).then(|| username.to_string())
}

fn parse_point(href: &str) -> Option<GeoPoint> {
    let caps = POINT_RE.captures(href)?;
    let point = GeoPoint::new(caps[1].parse().ok()?, caps[2].parse().ok()?);
    point.is_valid().then_some(point)
}

/// Link title, e.g. "Celosvětové vyhledávání přeletů:  Daia Română" -> "Daia Română".
/// The visible text is truncated by the site, so it is only a fallback.
fn takeoff_name(link: ElementRef<'_>) -> Option<String> {
    let from_title = link
        .value()
        .attr("title")
        .and_then(|title| title.rsplit(':').next())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());

    from_title.or_else(|| {
        let text = text_of(link);
        (!text.is_empty()).then_some(text)
    })
}

fn parse_strong_number(cell: ElementRef<'_>) -> Option<f64> {
    let strong = cell.select(&STRONG_SELECTOR).next()?;
    let value: f64 = text_of(strong).parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// "6 : 42" -> 402
fn parse_airtime(cell: ElementRef<'_>) -> Option<i32> {
    let text = cell
        .select(&AIRTIME_SELECTOR)
        .next()
        .map(text_of)
        .unwrap_or_else(|| text_of(cell));
    let caps = AIRTIME_RE.captures(&text)?;
    let hours: i32 = caps[1].parse().ok()?;
    let minutes: i32 = caps[2].parse().ok()?;
    Some(hours * 60 + minutes)
}

/// Certification class from the cell's `cat-X` class, name from the inner div title
fn parse_glider(cell: ElementRef<'_>) -> Option<NewGlider> {
    let category = cell
        .value()
        .classes()
        .find_map(|class| class.strip_prefix("cat-"))
        .filter(|cat| !cat.is_empty())?
        .to_string();
    let name = cell
        .select(&TITLED_DIV_SELECTOR)
        .next()?
        .value()
        .attr("title")?
        .trim()
        .to_string();
    (!name.is_empty()).then_some(NewGlider { name, category })
}
