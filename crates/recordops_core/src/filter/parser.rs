//! Tokenizer and parser for filter strings.
//!
//! Grammar:
//!
//! ```text
//! filter  := clause (";" clause)* [";"]
//! clause  := field "," comparator "," value
//! field   := [A-Za-z_][A-Za-z0-9_]*
//! value   := rest of the clause; commas allowed, "\;" and "\\" escape
//! ```

use super::FilterError;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Separates clauses inside one filter string.
pub const CLAUSE_SEPARATOR: char = ';';
const PART_SEPARATOR: char = ',';
const ESCAPE: char = '\\';

/// Comparison operator of one clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

impl Comparator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Like => "like",
        }
    }

    /// Parses a comparator token, ignoring ASCII case.
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "lt" => Some(Self::Lt),
            "le" => Some(Self::Le),
            "gt" => Some(Self::Gt),
            "ge" => Some(Self::Ge),
            "like" => Some(Self::Like),
            _ => None,
        }
    }

    pub fn is_ordering(self) -> bool {
        matches!(self, Self::Lt | Self::Le | Self::Gt | Self::Ge)
    }
}

impl Display for Comparator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `field,comparator,value` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub field: String,
    pub comparator: Comparator,
    /// Unescaped value text, surrounding whitespace preserved.
    pub value: String,
    source: String,
}

impl Clause {
    /// Clause text as written by the caller, used in error messages.
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Parsed filter: a conjunction of clauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterExpr {
    clauses: Vec<Clause>,
}

impl FilterExpr {
    pub fn parse(input: &str) -> Result<Self, FilterError> {
        if input.trim().is_empty() {
            return Err(FilterError::Empty);
        }

        let mut tokens = tokenize(input);
        if tokens.len() > 1 && tokens.last().is_some_and(|token| token.text.trim().is_empty()) {
            tokens.pop();
        }

        let clauses = tokens
            .into_iter()
            .map(parse_clause)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { clauses })
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Whether any clause filters on `field`.
    pub fn targets_field(&self, field: &str) -> bool {
        self.clauses.iter().any(|clause| clause.field == field)
    }
}

impl FromStr for FilterExpr {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Debug, Default)]
struct ClauseToken {
    /// Unescaped clause text.
    text: String,
    /// Raw clause text.
    source: String,
}

fn tokenize(input: &str) -> Vec<ClauseToken> {
    let mut tokens = Vec::new();
    let mut current = ClauseToken::default();
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        match ch {
            ESCAPE => {
                current.source.push(ch);
                match chars.next() {
                    Some(next @ (CLAUSE_SEPARATOR | ESCAPE)) => {
                        current.source.push(next);
                        current.text.push(next);
                    }
                    Some(next) => {
                        current.source.push(next);
                        current.text.push(ch);
                        current.text.push(next);
                    }
                    None => current.text.push(ch),
                }
            }
            CLAUSE_SEPARATOR => tokens.push(std::mem::take(&mut current)),
            _ => {
                current.source.push(ch);
                current.text.push(ch);
            }
        }
    }
    tokens.push(current);
    tokens
}

fn parse_clause(token: ClauseToken) -> Result<Clause, FilterError> {
    let source = token.source.trim().to_string();
    let mut parts = token.text.splitn(3, PART_SEPARATOR);
    let (Some(field), Some(comparator), Some(value)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(FilterError::MalformedClause { clause: source });
    };

    let field = field.trim();
    if !is_identifier(field) {
        return Err(FilterError::InvalidField {
            clause: source,
            field: field.to_string(),
        });
    }

    let comparator_token = comparator.trim();
    let Some(comparator) = Comparator::parse(comparator_token) else {
        return Err(FilterError::UnknownComparator {
            clause: source,
            comparator: comparator_token.to_string(),
        });
    };

    Ok(Clause {
        field: field.to_string(),
        comparator,
        value: value.to_string(),
        source,
    })
}

fn is_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::{Comparator, FilterExpr};
    use crate::filter::FilterError;

    #[test]
    fn parses_single_clause() {
        let expr = FilterExpr::parse("name,like,john").unwrap();
        let clause = &expr.clauses()[0];

        assert_eq!(expr.clauses().len(), 1);
        assert_eq!(clause.field, "name");
        assert_eq!(clause.comparator, Comparator::Like);
        assert_eq!(clause.value, "john");
    }

    #[test]
    fn semicolon_separates_clauses_and_trailing_separator_is_allowed() {
        let expr: FilterExpr = "age,gt,30; name , EQ ,Ada;".parse().unwrap();
        let fields: Vec<_> = expr
            .clauses()
            .iter()
            .map(|clause| (clause.field.as_str(), clause.comparator))
            .collect();

        assert_eq!(fields, vec![("age", Comparator::Gt), ("name", Comparator::Eq)]);
        assert!(expr.targets_field("name"));
        assert!(!expr.targets_field("deleted"));
    }

    #[test]
    fn value_keeps_commas_and_unescapes_separators() {
        let expr = FilterExpr::parse(r"city,eq,Paris, France;motto,eq,a\;b\\c\n").unwrap();

        assert_eq!(expr.clauses()[0].value, "Paris, France");
        assert_eq!(expr.clauses()[1].value, r"a;b\c\n");
        assert_eq!(expr.clauses()[1].source(), r"motto,eq,a\;b\\c\n");
    }

    #[test]
    fn rejects_empty_and_malformed_input() {
        assert_eq!(FilterExpr::parse("  "), Err(FilterError::Empty));
        assert_eq!(
            FilterExpr::parse("age,gt"),
            Err(FilterError::MalformedClause {
                clause: "age,gt".to_string()
            })
        );
        assert!(matches!(
            FilterExpr::parse("age,gt,1;;name,eq,x"),
            Err(FilterError::MalformedClause { clause }) if clause.is_empty()
        ));
    }

    #[test]
    fn rejects_bad_field_tokens_and_comparators() {
        assert!(matches!(
            FilterExpr::parse("1age,eq,3"),
            Err(FilterError::InvalidField { field, .. }) if field == "1age"
        ));
        assert!(matches!(
            FilterExpr::parse("age,between,3"),
            Err(FilterError::UnknownComparator { comparator, clause })
                if comparator == "between" && clause == "age,between,3"
        ));
    }

    #[test]
    fn ordering_comparators_are_flagged() {
        assert!(Comparator::Le.is_ordering());
        assert!(!Comparator::Ne.is_ordering());
        assert!(!Comparator::Like.is_ordering());
    }
}
