//! Filter-request handling for the property search endpoint.
//!
//! Every recognized filter becomes a parameterized clause on a boxed diesel
//! query; user values are always binds, never SQL text. Malformed values
//! degrade to "not applied" instead of failing the request, and the response
//! echoes which filters were actually recognized.

use diesel::pg::Pg;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::properties;

/// Numeric filter values arrive as JSON numbers or as strings, depending on
/// the client. Parsed leniently; anything unparseable counts as absent.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NumberOrText::Number(n) => Some(*n).filter(|v| v.is_finite()),
            NumberOrText::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            NumberOrText::Number(n) if n.is_finite() => Some(n.trunc() as i64),
            NumberOrText::Number(_) => None,
            NumberOrText::Text(s) => s.trim().parse::<i64>().ok(),
        }
    }
}

/// Price constraint, either a `"min-max"` delimited string or a structured
/// `{min, max}` object. Endpoints convert independently; an endpoint that
/// fails to parse is simply omitted.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PriceRange {
    Text(String),
    Bounds {
        min: Option<NumberOrText>,
        max: Option<NumberOrText>,
    },
}

impl PriceRange {
    pub fn bounds(&self) -> (Option<f64>, Option<f64>) {
        match self {
            PriceRange::Text(text) => {
                let mut parts = text.splitn(2, '-');
                let min = parts.next().and_then(parse_endpoint);
                let max = parts.next().and_then(parse_endpoint);
                (min, max)
            }
            PriceRange::Bounds { min, max } => (
                min.as_ref().and_then(NumberOrText::as_f64),
                max.as_ref().and_then(NumberOrText::as_f64),
            ),
        }
    }
}

fn parse_endpoint(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyFilter {
    pub search: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub bedroom: Option<NumberOrText>,
    pub size: Option<NumberOrText>,
    pub price_range: Option<PriceRange>,
}

/// Echo of the filters that were actually applied, returned alongside the
/// result set. Unparseable numeric filters report as null.
#[derive(Debug, Serialize)]
pub struct AppliedFilters {
    pub search: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub bedroom: Option<i64>,
    pub size: Option<f64>,
    pub price_range: Option<PriceRange>,
}

impl PropertyFilter {
    pub fn applied(&self) -> AppliedFilters {
        AppliedFilters {
            search: self.search.clone().filter(|s| !s.is_empty()),
            status: self.status.clone().filter(|s| !s.is_empty()),
            category: self.category.clone().filter(|s| !s.is_empty()),
            sub_category: self.sub_category.clone().filter(|s| !s.is_empty()),
            bedroom: self.bedroom.as_ref().and_then(NumberOrText::as_i64),
            size: self.size.as_ref().and_then(NumberOrText::as_f64),
            price_range: self.price_range.clone(),
        }
    }
}

/// Builds the filtered property query. All clauses are conjunctive; results
/// are ordered newest-first.
pub fn build_query(criteria: &PropertyFilter) -> properties::BoxedQuery<'static, Pg> {
    use crate::schema::properties::dsl::*;

    let mut query = properties.into_boxed();

    if let Some(term) = non_blank(criteria.search.as_deref()) {
        let pattern = format!("%{}%", term);
        query = query.filter(title.ilike(pattern.clone()).or(location.ilike(pattern)));
    }
    if let Some(value) = non_blank(criteria.status.as_deref()) {
        query = query.filter(status.eq(value.to_string()));
    }
    if let Some(value) = non_blank(criteria.category.as_deref()) {
        query = query.filter(category.eq(value.to_string()));
    }
    if let Some(value) = non_blank(criteria.sub_category.as_deref()) {
        query = query.filter(sub_category.eq(value.to_string()));
    }
    // bedroom is a blank-allowed text column; the parsed integer matches its
    // decimal string form.
    if let Some(value) = criteria.bedroom.as_ref().and_then(NumberOrText::as_i64) {
        query = query.filter(bedroom.eq(value.to_string()));
    }
    if let Some(value) = criteria.size.as_ref().and_then(NumberOrText::as_f64) {
        query = query.filter(size.eq(value));
    }
    if let Some(range) = &criteria.price_range {
        let (min, max) = range.bounds();
        if let Some(min) = min {
            query = query.filter(price.ge(min));
        }
        if let Some(max) = max {
            query = query.filter(price.le(max));
        }
    }

    query.order(created_at.desc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::debug_query;

    fn sql_for(criteria: &PropertyFilter) -> String {
        debug_query::<Pg, _>(&build_query(criteria)).to_string()
    }

    #[test]
    fn blank_filters_add_no_clauses() {
        let criteria = PropertyFilter {
            search: Some("   ".to_string()),
            status: Some(String::new()),
            ..Default::default()
        };
        let sql = sql_for(&criteria);
        assert!(!sql.contains("WHERE"));
        assert!(sql.contains("ORDER BY"));
        assert!(sql.contains(r#""created_at" DESC"#));
    }

    #[test]
    fn search_matches_title_or_location_with_two_binds() {
        let criteria = PropertyFilter {
            search: Some("villa".to_string()),
            ..Default::default()
        };
        let sql = sql_for(&criteria);
        assert_eq!(sql.matches("ILIKE").count(), 2);
        assert!(sql.contains(" OR "));
        assert!(sql.contains("%villa%"));
    }

    #[test]
    fn exact_match_values_are_trimmed() {
        let criteria = PropertyFilter {
            status: Some("  For Sale ".to_string()),
            ..Default::default()
        };
        let sql = sql_for(&criteria);
        assert!(sql.contains(r#""status" = $"#));
        assert!(sql.contains(r#""For Sale""#));
    }

    #[test]
    fn malformed_bedroom_is_dropped_and_echoed_null() {
        let criteria = PropertyFilter {
            bedroom: Some(NumberOrText::Text("abc".to_string())),
            ..Default::default()
        };
        assert!(!sql_for(&criteria).contains(r#""bedroom" = "#));
        assert_eq!(criteria.applied().bedroom, None);
    }

    #[test]
    fn bedroom_compares_against_text_column() {
        let criteria = PropertyFilter {
            bedroom: Some(NumberOrText::Number(3.0)),
            ..Default::default()
        };
        let sql = sql_for(&criteria);
        assert!(sql.contains(r#""bedroom" = $"#));
        assert!(sql.contains(r#""3""#));
    }

    #[test]
    fn malformed_size_is_dropped() {
        let criteria = PropertyFilter {
            size: Some(NumberOrText::Text("big".to_string())),
            ..Default::default()
        };
        assert!(!sql_for(&criteria).contains(r#""size" = "#));
        assert_eq!(criteria.applied().size, None);
    }

    #[test]
    fn delimited_price_range_yields_both_bounds() {
        let criteria = PropertyFilter {
            price_range: Some(PriceRange::Text("100-500".to_string())),
            ..Default::default()
        };
        let sql = sql_for(&criteria);
        assert!(sql.contains(r#""price" >= $"#));
        assert!(sql.contains(r#""price" <= $"#));
    }

    #[test]
    fn structured_min_only_yields_one_sided_clause() {
        let criteria = PropertyFilter {
            price_range: Some(PriceRange::Bounds {
                min: Some(NumberOrText::Number(200.0)),
                max: None,
            }),
            ..Default::default()
        };
        let sql = sql_for(&criteria);
        assert!(sql.contains(r#""price" >= $"#));
        assert!(!sql.contains(r#""price" <= "#));
    }

    #[test]
    fn unparseable_price_range_adds_no_clause() {
        let criteria = PropertyFilter {
            price_range: Some(PriceRange::Text("cheap".to_string())),
            ..Default::default()
        };
        let sql = sql_for(&criteria);
        assert!(!sql.contains(r#""price" >= "#));
        assert!(!sql.contains(r#""price" <= "#));
    }

    #[test]
    fn string_bounds_parse_independently() {
        let range = PriceRange::Bounds {
            min: Some(NumberOrText::Text("250".to_string())),
            max: Some(NumberOrText::Text("oops".to_string())),
        };
        assert_eq!(range.bounds(), (Some(250.0), None));
    }

    #[test]
    fn applied_reports_recognized_filters() {
        let criteria = PropertyFilter {
            search: Some(String::new()),
            bedroom: Some(NumberOrText::Text(" 4 ".to_string())),
            size: Some(NumberOrText::Number(120.5)),
            price_range: Some(PriceRange::Text("100-500".to_string())),
            ..Default::default()
        };
        let applied = criteria.applied();
        assert_eq!(applied.search, None);
        assert_eq!(applied.bedroom, Some(4));
        assert_eq!(applied.size, Some(120.5));
        assert!(applied.price_range.is_some());
    }

    #[test]
    fn filter_deserializes_numbers_and_strings() {
        let criteria: PropertyFilter = serde_json::from_str(
            r#"{"bedroom": 2, "size": "85.5", "price_range": {"min": 200}}"#,
        )
        .unwrap();
        assert_eq!(criteria.bedroom.as_ref().and_then(NumberOrText::as_i64), Some(2));
        assert_eq!(criteria.size.as_ref().and_then(NumberOrText::as_f64), Some(85.5));
        let (min, max) = criteria.price_range.as_ref().unwrap().bounds();
        assert_eq!((min, max), (Some(200.0), None));
    }
}
