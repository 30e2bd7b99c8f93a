//! # SQL-like queries on a track
//!
//! [`Track::query`] accepts a restricted grammar where **blanks strictly separate
//! tokens**:
//!
//! ```text
//! SELECT (* | f1,f2,… | AGG(f1),AGG(f2),…) [WHERE cond ((AND | OR) cond)*]
//! cond := field operator threshold
//! operator := < | <= | = | == | != | > | >= | LIKE
//! ```
//!
//! * `AND` binds tighter than `OR`; parentheses are rejected.
//! * The threshold is cast to the runtime type of the field: number (`true`/`false`
//!   read as 1/0), text (single quotes optional, may contain blanks when quoted) or
//!   timestamp for the `timestamp` field (parsed with the thread's read format).
//! * `LIKE` only applies to text fields, with `%` matching any sequence of characters.
//!
//! | Selection   | Result                                                      |
//! |-------------|-------------------------------------------------------------|
//! | `*`         | [`QueryResult::Track`], copy with the matching observations |
//! | fields      | [`QueryResult::Columns`], one column per field              |
//! | `AGG(f)`    | [`QueryResult::Scalar`]                                     |
//! | several AGG | [`QueryResult::Scalars`]                                    |
//!
//! Aggregates are `COUNT` (number of matching observations) and the column reducers
//! `SUM, AVG, VAR, MEDIAN, ARGMIN, ARGMAX, MIN, MAX, RMSE, MAD, STDDEV, ZEROS`.
use std::cmp::Ordering;

use log::debug;
use regex::Regex;

use crate::operator::reducer::UnaryReducer;
use crate::time::GPSTime;
use crate::track::{FeatureValue, Track};
use crate::track_errors::TrackError;

/// Runtime value of a field or threshold.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Time(GPSTime),
}

impl FieldValue {
    fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Number(a), FieldValue::Number(b)) => a.partial_cmp(b),
            (FieldValue::Text(a), FieldValue::Text(b)) => Some(a.cmp(b)),
            (FieldValue::Time(a), FieldValue::Time(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Track(Track),
    Columns(Vec<(String, Vec<FeatureValue>)>),
    Scalar(f64),
    Scalars(Vec<f64>),
}

impl QueryResult {
    pub fn into_track(self) -> Option<Track> {
        match self {
            QueryResult::Track(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            QueryResult::Scalar(v) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Lt,
    Le,
    Eq,
    Ne,
    Gt,
    Ge,
    Like,
}

impl Comparator {
    fn parse(token: &str) -> Result<Self, TrackError> {
        Ok(match token {
            "<" => Comparator::Lt,
            "<=" => Comparator::Le,
            "=" | "==" => Comparator::Eq,
            "!=" => Comparator::Ne,
            ">" => Comparator::Gt,
            ">=" => Comparator::Ge,
            t if t.eq_ignore_ascii_case("LIKE") => Comparator::Like,
            other => return Err(TrackError::ParseError(format!("unknown comparison operator '{other}'"))),
        })
    }

    fn holds(&self, ordering: Option<Ordering>) -> bool {
        match (self, ordering) {
            (Comparator::Ne, None) => true,
            (_, None) => false,
            (Comparator::Lt, Some(o)) => o == Ordering::Less,
            (Comparator::Le, Some(o)) => o != Ordering::Greater,
            (Comparator::Eq, Some(o)) => o == Ordering::Equal,
            (Comparator::Ne, Some(o)) => o != Ordering::Equal,
            (Comparator::Gt, Some(o)) => o == Ordering::Greater,
            (Comparator::Ge, Some(o)) => o != Ordering::Less,
            (Comparator::Like, _) => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Condition {
    pub field: String,
    pub comparator: Comparator,
    pub threshold: String,
    quoted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregate {
    Count,
    Reduce(UnaryReducer),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    All,
    Fields(Vec<String>),
    Aggregates(Vec<(Aggregate, String)>),
}

/// Parsed query, see the module documentation for the grammar.
#[derive(Debug, Clone)]
pub struct Query {
    pub selection: Selection,
    /// Disjunction of conjunctions
    pub filter: Vec<Vec<Condition>>,
}

fn parse_error(msg: impl Into<String>) -> TrackError {
    TrackError::ParseError(msg.into())
}

/// Split on blanks, keeping single-quoted runs (quotes included) in one token.
fn tokenize(sql: &str) -> Result<Vec<String>, TrackError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in sql.chars() {
        match c {
            '\'' => {
                quoted = !quoted;
                current.push(c);
            }
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if quoted {
        return Err(parse_error(format!("unbalanced quote in '{sql}'")));
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

fn parse_selection(items: &str) -> Result<Selection, TrackError> {
    if items == "*" {
        return Ok(Selection::All);
    }
    let parts: Vec<&str> = items.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
    if parts.is_empty() {
        return Err(parse_error("empty SELECT list"));
    }
    let aggregates: Vec<Option<(Aggregate, String)>> = parts
        .iter()
        .map(|p| {
            let open = p.find('(')?;
            let inner = p[open + 1..].strip_suffix(')')?;
            let name = &p[..open];
            let agg = if name.eq_ignore_ascii_case("COUNT") {
                Aggregate::Count
            } else {
                Aggregate::Reduce(UnaryReducer::from_name(name)?)
            };
            Some((agg, inner.to_string()))
        })
        .collect();
    let nb_aggregates = aggregates.iter().filter(|a| a.is_some()).count();
    if nb_aggregates == parts.len() {
        return Ok(Selection::Aggregates(aggregates.into_iter().flatten().collect()));
    }
    if nb_aggregates > 0 {
        return Err(parse_error("cannot mix aggregates and plain fields in SELECT"));
    }
    if let Some(p) = parts.iter().find(|p| p.contains('(') || p.contains(')')) {
        return Err(parse_error(format!("unknown aggregate '{p}'")));
    }
    Ok(Selection::Fields(parts.iter().map(|p| p.to_string()).collect()))
}

impl Query {
    pub fn parse(sql: &str) -> Result<Query, TrackError> {
        let tokens = tokenize(sql)?;
        match tokens.first() {
            Some(t) if t.eq_ignore_ascii_case("SELECT") => {}
            _ => return Err(parse_error(format!("query must start with SELECT: '{sql}'"))),
        }
        let where_at = tokens
            .iter()
            .position(|t| t.eq_ignore_ascii_case("WHERE"))
            .unwrap_or(tokens.len());
        let selection = parse_selection(&tokens[1..where_at].concat())?;

        let mut filter: Vec<Vec<Condition>> = Vec::new();
        if where_at < tokens.len() {
            let clause = &tokens[where_at + 1..];
            if clause.is_empty() {
                return Err(parse_error("empty WHERE clause"));
            }
            let mut conjunction = Vec::new();
            let mut k = 0;
            loop {
                let cond = clause
                    .get(k..k + 3)
                    .ok_or_else(|| parse_error(format!("incomplete condition in '{sql}'")))?;
                for t in &cond[..2] {
                    if t.contains('(') || t.contains(')') {
                        return Err(parse_error("parentheses are not supported in WHERE clauses"));
                    }
                }
                let raw = &cond[2];
                let quoted = raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'');
                if !quoted && (raw.contains('(') || raw.contains(')')) {
                    return Err(parse_error("parentheses are not supported in WHERE clauses"));
                }
                conjunction.push(Condition {
                    field: cond[0].clone(),
                    comparator: Comparator::parse(&cond[1])?,
                    threshold: if quoted { raw[1..raw.len() - 1].to_string() } else { raw.clone() },
                    quoted,
                });
                k += 3;
                match clause.get(k) {
                    None => break,
                    Some(op) if op.eq_ignore_ascii_case("AND") => {}
                    Some(op) if op.eq_ignore_ascii_case("OR") => {
                        filter.push(std::mem::take(&mut conjunction));
                    }
                    Some(other) => return Err(parse_error(format!("expected AND/OR, found '{other}'"))),
                }
                k += 1;
            }
            filter.push(conjunction);
        }
        Ok(Query { selection, filter })
    }

    /// Indices of the observations of `track` satisfying the WHERE clause.
    pub fn matching(&self, track: &Track) -> Result<Vec<usize>, TrackError> {
        if self.filter.is_empty() {
            return Ok((0..track.size()).collect());
        }
        let evaluated: Vec<Vec<Vec<bool>>> = self
            .filter
            .iter()
            .map(|conj| conj.iter().map(|c| c.evaluate(track)).collect::<Result<Vec<_>, TrackError>>())
            .collect::<Result<_, _>>()?;
        Ok((0..track.size())
            .filter(|&i| evaluated.iter().any(|conj| conj.iter().all(|mask| mask[i])))
            .collect())
    }

    pub fn execute(&self, track: &Track) -> Result<QueryResult, TrackError> {
        let rows = self.matching(track)?;
        debug!("query matched {} of {} observations", rows.len(), track.size());
        match &self.selection {
            Selection::All => {
                let obs = track.observations();
                Ok(QueryResult::Track(
                    track.with_observations_of(rows.iter().map(|&i| obs[i].clone()).collect()),
                ))
            }
            Selection::Fields(fields) => fields
                .iter()
                .map(|f| {
                    let column = track.get_feature_values(f)?;
                    Ok((f.clone(), rows.iter().map(|&i| column[i].clone()).collect()))
                })
                .collect::<Result<Vec<_>, TrackError>>()
                .map(QueryResult::Columns),
            Selection::Aggregates(aggs) => {
                let values = aggs
                    .iter()
                    .map(|(agg, f)| {
                        let column = track.get_analytical_feature(f)?;
                        let selected: Vec<f64> = rows.iter().map(|&i| column[i]).collect();
                        Ok(match agg {
                            Aggregate::Count => selected.len() as f64,
                            Aggregate::Reduce(r) => r.reduce(&selected),
                        })
                    })
                    .collect::<Result<Vec<f64>, TrackError>>()?;
                Ok(if values.len() == 1 {
                    QueryResult::Scalar(values[0])
                } else {
                    QueryResult::Scalars(values)
                })
            }
        }
    }
}

fn like_regex(pattern: &str) -> Result<Regex, TrackError> {
    let body: Vec<String> = pattern.split('%').map(regex::escape).collect();
    Regex::new(&format!("^{}$", body.join(".*")))
        .map_err(|e| parse_error(format!("invalid LIKE pattern '{pattern}': {e}")))
}

impl Condition {
    fn threshold_as(&self, field_kind: &FieldValue) -> Result<FieldValue, TrackError> {
        let t = self.threshold.as_str();
        match field_kind {
            FieldValue::Text(_) => Ok(FieldValue::Text(t.to_string())),
            FieldValue::Time(_) => GPSTime::parse(t).map(FieldValue::Time),
            FieldValue::Number(_) => {
                if t.eq_ignore_ascii_case("true") {
                    return Ok(FieldValue::Number(1.0));
                }
                if t.eq_ignore_ascii_case("false") {
                    return Ok(FieldValue::Number(0.0));
                }
                t.parse::<f64>()
                    .map(FieldValue::Number)
                    .map_err(|_| parse_error(format!("cannot compare numeric field {} with '{t}'", self.field)))
            }
        }
    }

    /// Mask of the observations satisfying the condition.
    fn evaluate(&self, track: &Track) -> Result<Vec<bool>, TrackError> {
        let values: Vec<FieldValue> = if self.field == "timestamp" {
            track.get_timestamps().into_iter().map(FieldValue::Time).collect()
        } else if track.is_text_feature(&self.field)? {
            track
                .get_feature_values(&self.field)?
                .into_iter()
                .map(|v| match v {
                    FeatureValue::Text(s) => FieldValue::Text(s),
                    FeatureValue::Num(x) => FieldValue::Text(x.to_string()),
                })
                .collect()
        } else {
            track
                .get_analytical_feature(&self.field)?
                .into_iter()
                .map(FieldValue::Number)
                .collect()
        };

        if self.comparator == Comparator::Like {
            let text_field = matches!(values.first(), Some(FieldValue::Text(_)))
                || (values.is_empty() && track.is_text_feature(&self.field)?);
            if !text_field || (!self.quoted && self.threshold.parse::<f64>().is_ok()) {
                return Err(parse_error(format!(
                    "LIKE needs a text field and a string pattern ({} LIKE {})",
                    self.field, self.threshold
                )));
            }
            let re = like_regex(&self.threshold)?;
            return Ok(values
                .iter()
                .map(|v| matches!(v, FieldValue::Text(s) if re.is_match(s)))
                .collect());
        }

        let Some(kind) = values.first() else {
            return Ok(Vec::new());
        };
        let threshold = self.threshold_as(kind)?;
        Ok(values
            .iter()
            .map(|v| self.comparator.holds(v.compare(&threshold)))
            .collect())
    }
}

impl Track {
    /// Run a `SELECT … WHERE …` query, see the [module documentation](crate::query).
    ///
    /// Errors
    /// ------
    /// * [`TrackError::ParseError`] on a malformed query, an uncastable threshold or a
    ///   `LIKE` on a non-text field,
    /// * [`TrackError::UnknownFeature`] for an unknown field
    pub fn query(&self, sql: &str) -> Result<QueryResult, TrackError> {
        Query::parse(sql)?.execute(self)
    }
}

#[cfg(test)]
mod query_test {
    use super::*;
    use crate::track::enu_track;
    use approx::assert_abs_diff_eq;

    fn track() -> Track {
        let mut t = enu_track(&[(0., 0., 0.), (1., 0., 0.), (2., 0., 0.), (3., 0., 0.)], 1.0);
        t.create_analytical_feature("speed", vec![0.7, 0.2, 0.7, 0.2]).unwrap();
        t.create_constant_feature("mode", FeatureValue::from("walk")).unwrap();
        t.set_obs_analytical_feature("mode", 2, "bike lane").unwrap();
        t
    }

    #[test]
    fn test_select_all_where() {
        let t = track();
        let out = t.query("SELECT * WHERE speed > 0.5").unwrap().into_track().unwrap();
        assert_eq!(out.size(), 2);
        assert_eq!(out.get_analytical_feature("speed").unwrap(), vec![0.7, 0.7]);
        assert_eq!(out.get_x(), vec![0.0, 2.0]);
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let t = track();
        let out = t
            .query("SELECT x WHERE speed < 0.5 AND x > 2 OR idx == 0")
            .unwrap();
        assert_eq!(
            out,
            QueryResult::Columns(vec![("x".into(), vec![FeatureValue::Num(0.0), FeatureValue::Num(3.0)])])
        );
    }

    #[test]
    fn test_aggregates() {
        let t = track();
        assert_eq!(t.query("SELECT COUNT(x) WHERE idx < 0").unwrap(), QueryResult::Scalar(0.0));
        let avg = t.query("SELECT AVG(speed)").unwrap().as_scalar().unwrap();
        assert_abs_diff_eq!(avg, 0.45, epsilon = 1e-12);
        assert_eq!(
            t.query("SELECT MAX(speed), ARGMIN(speed) WHERE x >= 1").unwrap(),
            QueryResult::Scalars(vec![0.7, 0.0])
        );
    }

    #[test]
    fn test_text_fields_and_like() {
        let t = track();
        let out = t.query("SELECT * WHERE mode = 'bike lane'").unwrap().into_track().unwrap();
        assert_eq!(out.size(), 1);
        let out = t.query("SELECT idx WHERE mode LIKE 'w%'").unwrap();
        assert_eq!(
            out,
            QueryResult::Columns(vec![(
                "idx".into(),
                vec![FeatureValue::Num(0.0), FeatureValue::Num(1.0), FeatureValue::Num(3.0)]
            )])
        );
        assert!(matches!(t.query("SELECT * WHERE speed LIKE '0%'"), Err(TrackError::ParseError(_))));
    }

    #[test]
    fn test_timestamp_threshold() {
        let t = track();
        let out = t
            .query("SELECT * WHERE timestamp >= '1970-01-01 00:00:02'")
            .unwrap()
            .into_track()
            .unwrap();
        assert_eq!(out.size(), 2);
    }

    #[test]
    fn test_rejected_queries() {
        let t = track();
        for q in [
            "SELECT * WHERE (speed > 0.5)",
            "SELECT * WHERE speed > abc",
            "SELECT * WHERE speed >",
            "SELECT * WHERE speed ~ 1",
            "DELETE *",
            "SELECT AVG(speed), x",
            "SELECT * WHERE mode = 'open",
        ] {
            assert!(matches!(t.query(q), Err(TrackError::ParseError(_))), "{q}");
        }
        assert!(matches!(t.query("SELECT nope"), Err(TrackError::UnknownFeature(_))));
    }
}
