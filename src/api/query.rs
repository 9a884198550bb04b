//! Query options applied to the full ranking before it is returned.
//!
//! A small subset of the OData system query options:
//!
//! - `$filter`: `<field> <eq|ne|gt|ge|lt|le> <literal>` or
//!   `<contains|startswith|endswith>(name,'text')`, joined by `and`
//! - `$orderby`: `<field> [asc|desc]`, comma separated
//! - `$select`: fields to keep, comma separated
//! - `$top` / `$skip`: paging
//! - `$count=true`: wrap the result as `{"@odata.count": n, "value": [..]}`
//!
//! They are applied in the order filter, count, orderby, skip, top, select.

use crate::error::{RankingError, RankingResult};
use crate::wta::ranking::Player;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::str::FromStr;
use strum::{Display, EnumString};

static REGEX_COMPARISON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\w+)\s+(\w+)\s+('(?:[^']|'')*'|-?\d+)\s*").unwrap()
});
static REGEX_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\w+)\s*\(\s*(\w+)\s*,\s*('(?:[^']|'')*')\s*\)\s*").unwrap()
});
static REGEX_AND: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^and\b").unwrap());

/// Raw query string, as sent by the caller.
#[derive(Debug, Default, Deserialize)]
pub struct QueryOptions {
    #[serde(rename = "$filter")]
    pub filter: Option<String>,
    #[serde(rename = "$orderby")]
    pub orderby: Option<String>,
    #[serde(rename = "$select")]
    pub select: Option<String>,
    #[serde(rename = "$top")]
    pub top: Option<usize>,
    #[serde(rename = "$skip")]
    pub skip: Option<usize>,
    #[serde(rename = "$count")]
    pub count: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PlayerField {
    Rank,
    Name,
    Points,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
enum Comparison {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
enum TextFunction {
    Contains,
    StartsWith,
    EndsWith,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Number(PlayerField, Comparison, i64),
    Text(PlayerField, Comparison, String),
    Function(TextFunction, PlayerField, String),
}

/// Validated query options.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PlayerQuery {
    filter: Vec<Predicate>,
    orderby: Vec<(PlayerField, Direction)>,
    select: Option<Vec<PlayerField>>,
    top: Option<usize>,
    skip: Option<usize>,
    count: bool,
}

impl PlayerField {
    fn is_numeric(&self) -> bool {
        !matches!(self, PlayerField::Name)
    }

    fn number(&self, player: &Player) -> i64 {
        match self {
            PlayerField::Rank => player.rank().into(),
            PlayerField::Points => player.points().into(),
            // Text field, never reached once the query has been validated.
            PlayerField::Name => 0,
        }
    }

    fn value(&self, player: &Player) -> Value {
        match self {
            PlayerField::Rank => json!(player.rank()),
            PlayerField::Name => json!(player.name()),
            PlayerField::Points => json!(player.points()),
        }
    }

    fn compare(&self, a: &Player, b: &Player) -> Ordering {
        match self {
            PlayerField::Name => a.name().cmp(b.name()),
            _ => self.number(a).cmp(&self.number(b)),
        }
    }
}

impl Comparison {
    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            Comparison::Eq => ordering == Ordering::Equal,
            Comparison::Ne => ordering != Ordering::Equal,
            Comparison::Gt => ordering == Ordering::Greater,
            Comparison::Ge => ordering != Ordering::Less,
            Comparison::Lt => ordering == Ordering::Less,
            Comparison::Le => ordering != Ordering::Greater,
        }
    }
}

impl Predicate {
    fn matches(&self, player: &Player) -> bool {
        match self {
            Predicate::Number(field, op, value) => op.holds(field.number(player).cmp(value)),
            Predicate::Text(_, op, value) => op.holds(player.name().cmp(value.as_str())),
            Predicate::Function(function, _, value) => match function {
                TextFunction::Contains => player.name().contains(value.as_str()),
                TextFunction::StartsWith => player.name().starts_with(value.as_str()),
                TextFunction::EndsWith => player.name().ends_with(value.as_str()),
            },
        }
    }
}

fn parse_token<T: FromStr>(kind: &str, token: &str) -> RankingResult<T> {
    T::from_str(token.trim())
        .map_err(|_| RankingError::Query(format!("unknown {kind} '{}'", token.trim())))
}

// Single-quoted literal, with '' standing for an embedded quote.
fn unquote(literal: &str) -> String {
    literal[1..literal.len() - 1].replace("''", "'")
}

fn parse_predicate(captures: &Captures, function: bool) -> RankingResult<Predicate> {
    if function {
        let name: TextFunction = parse_token("function", &captures[1])?;
        let field: PlayerField = parse_token("field", &captures[2])?;
        if field.is_numeric() {
            return Err(RankingError::Query(format!(
                "'{}' only applies to text fields",
                &captures[1]
            )));
        }
        return Ok(Predicate::Function(name, field, unquote(&captures[3])));
    }

    let field: PlayerField = parse_token("field", &captures[1])?;
    let op: Comparison = parse_token("operator", &captures[2])?;
    let literal = &captures[3];
    match (field.is_numeric(), literal.starts_with('\'')) {
        (true, false) => literal
            .parse::<i64>()
            .map(|value| Predicate::Number(field, op, value))
            .map_err(|_| RankingError::Query(format!("invalid number '{literal}'"))),
        (false, true) => Ok(Predicate::Text(field, op, unquote(literal))),
        (true, true) => Err(RankingError::Query(format!(
            "'{field}' must be compared with a number"
        ))),
        (false, false) => Err(RankingError::Query(format!(
            "'{field}' must be compared with a quoted string"
        ))),
    }
}

fn parse_filter(input: &str) -> RankingResult<Vec<Predicate>> {
    let mut predicates = Vec::new();
    let mut rest = input.trim();

    loop {
        let (predicate, consumed) = if let Some(captures) = REGEX_FUNCTION.captures(rest) {
            (parse_predicate(&captures, true)?, captures[0].len())
        } else if let Some(captures) = REGEX_COMPARISON.captures(rest) {
            (parse_predicate(&captures, false)?, captures[0].len())
        } else {
            return Err(RankingError::Query(format!("invalid filter near '{rest}'")));
        };
        predicates.push(predicate);
        rest = &rest[consumed..];

        if rest.is_empty() {
            return Ok(predicates);
        }
        match REGEX_AND.find(rest) {
            Some(and) => rest = &rest[and.end()..],
            None => return Err(RankingError::Query(format!("expected 'and' near '{rest}'"))),
        }
    }
}

fn parse_orderby(input: &str) -> RankingResult<Vec<(PlayerField, Direction)>> {
    input
        .split(',')
        .map(|clause| {
            let mut words = clause.split_whitespace();
            let field = words
                .next()
                .ok_or_else(|| RankingError::Query("empty $orderby clause".to_string()))?;
            let field: PlayerField = parse_token("field", field)?;
            let direction = match words.next() {
                Some(direction) => parse_token("direction", direction)?,
                None => Direction::Asc,
            };
            match words.next() {
                Some(extra) => Err(RankingError::Query(format!(
                    "unexpected '{extra}' in $orderby"
                ))),
                None => Ok((field, direction)),
            }
        })
        .collect()
}

fn parse_select(input: &str) -> RankingResult<Vec<PlayerField>> {
    input
        .split(',')
        .map(|field| parse_token::<PlayerField>("field", field))
        .collect::<RankingResult<Vec<PlayerField>>>()
        .map(|fields| fields.into_iter().unique().collect())
}

impl TryFrom<QueryOptions> for PlayerQuery {
    type Error = RankingError;

    fn try_from(options: QueryOptions) -> RankingResult<Self> {
        Ok(PlayerQuery {
            filter: options.filter.as_deref().map_or(Ok(vec![]), parse_filter)?,
            orderby: options.orderby.as_deref().map_or(Ok(vec![]), parse_orderby)?,
            select: options.select.as_deref().map(parse_select).transpose()?,
            top: options.top,
            skip: options.skip,
            count: options.count.unwrap_or(false),
        })
    }
}

impl PlayerQuery {
    /// Shapes the ranking into the JSON document returned to the caller.
    pub fn apply(&self, players: &[Player]) -> Value {
        let filtered = players
            .iter()
            .filter(|player| self.filter.iter().all(|p| p.matches(player)))
            .collect::<Vec<&Player>>();
        let total = filtered.len();

        let items = filtered
            .into_iter()
            // stable sort, ties keep ranking order
            .sorted_by(|a, b| {
                self.orderby
                    .iter()
                    .map(|(field, direction)| match direction {
                        Direction::Asc => field.compare(a, b),
                        Direction::Desc => field.compare(b, a),
                    })
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(Ordering::Equal)
            })
            .skip(self.skip.unwrap_or(0))
            .take(self.top.unwrap_or(usize::MAX))
            .map(|player| self.project(player))
            .collect::<Vec<Value>>();

        match self.count {
            true => json!({ "@odata.count": total, "value": items }),
            false => Value::Array(items),
        }
    }

    fn project(&self, player: &Player) -> Value {
        match &self.select {
            None => json!(player),
            Some(fields) => Value::Object(
                fields
                    .iter()
                    .map(|field| (field.to_string(), field.value(player)))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }
}
