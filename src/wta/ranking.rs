use crate::error::{RankingError, RankingResult};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::ops::Deref;

/// Maximum number of players kept from a scrape.
pub const MAX_PLAYERS: usize = 100;

// Only a single table on the live ranking page, data rows live in its body.
static SELECTOR_ROWS: Lazy<Selector> = Lazy::new(|| Selector::parse("tbody > tr").unwrap());
// Markup tags and non-breaking spaces surrounding the rank number.
static REGEX_RANK_CLEANER: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>|&nbsp;").unwrap());

/// Layout of a data row on the scraped page. The page carries no versioning of
/// its own, any change to its table is a change to this contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSchema {
    pub cell_count: usize,
    pub rank: usize,
    pub name: usize,
    pub points: usize,
}

impl RowSchema {
    pub const LIVE_TENNIS_V1: RowSchema = RowSchema {
        cell_count: 14,
        rank: 0,
        name: 3,
        points: 6,
    };

    fn validate(&self) -> RankingResult<()> {
        match [self.rank, self.name, self.points]
            .into_iter()
            .find(|index| *index >= self.cell_count)
        {
            Some(index) => Err(RankingError::Parse(format!(
                "cell {index} is out of a {} cell row",
                self.cell_count
            ))),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Player {
    rank: u32,
    name: String,
    points: u32,
}

impl Player {
    pub fn rank(&self) -> u32 {
        self.rank
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn points(&self) -> u32 {
        self.points
    }

    #[cfg(test)]
    pub(crate) fn new(rank: u32, name: &str, points: u32) -> Self {
        Player {
            rank,
            name: name.to_string(),
            points,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrapedRanking {
    pub timestamp: DateTime<Utc>,
    pub players: Vec<Player>,
}

impl ScrapedRanking {
    pub fn new(players: Vec<Player>) -> ScrapedRanking {
        ScrapedRanking {
            timestamp: Utc::now(),
            players,
        }
    }

    pub fn empty() -> ScrapedRanking {
        ScrapedRanking::new(Vec::new())
    }
}

impl Deref for ScrapedRanking {
    type Target = Vec<Player>;

    fn deref(&self) -> &Self::Target {
        &self.players
    }
}

/// Extracts the top players from the live ranking page.
///
/// Rows are kept when they sit at an even position in the table body and carry
/// exactly `cell_count` cells, which discards the spacer rows interleaved by the
/// page. A single malformed rank or points cell fails the whole document.
pub fn parse_ranking(document: &str) -> RankingResult<Vec<Player>> {
    parse_ranking_with(document, &RowSchema::LIVE_TENNIS_V1)
}

pub fn parse_ranking_with(document: &str, schema: &RowSchema) -> RankingResult<Vec<Player>> {
    schema.validate()?;
    let document = Html::parse_document(document);

    document
        .select(&SELECTOR_ROWS)
        .enumerate()
        .map(|(index, row)| (index, cells(row)))
        .filter(|(index, cells)| index % 2 == 0 && cells.len() == schema.cell_count)
        .take(MAX_PLAYERS)
        .map(|(index, cells)| player_from_cells(index, &cells, schema))
        .collect()
}

fn cells(row: ElementRef) -> Vec<ElementRef> {
    row.children().filter_map(ElementRef::wrap).collect()
}

fn player_from_cells(index: usize, cells: &[ElementRef], schema: &RowSchema) -> RankingResult<Player> {
    let rank_html = cells[schema.rank].inner_html();
    let rank = REGEX_RANK_CLEANER.replace_all(&rank_html, "");
    let rank = parse_number(index, "rank", rank.trim())?;

    let name = text(cells[schema.name]).trim().to_string();

    let points = text(cells[schema.points]);
    let points = parse_number(index, "points", points.trim())?;

    Ok(Player { rank, name, points })
}

fn text(cell: ElementRef) -> String {
    cell.text().collect::<String>()
}

fn parse_number(index: usize, field: &str, value: &str) -> RankingResult<u32> {
    value
        .parse::<u32>()
        .map_err(|_| RankingError::Parse(format!("row {index}: invalid {field} '{value}'")))
}
