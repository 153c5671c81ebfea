//! Semantic type rule cascade
//!
//! Each rule is a pure predicate over a column sample. Rules are tried in
//! cascade order (numeric, date, identifier, categorical) and the first one
//! that accepts decides the type; a column no rule accepts is text.

use crate::analyzer::AnalyzerConfig;
use crate::schema::{SemanticType, ValuePattern};
use chrono::{NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref CODE_PATTERN: Regex =
        Regex::new(r"^[A-Za-z0-9]+(?:[-_./][A-Za-z0-9]+)*$").expect("valid code regex");
    static ref CODE_NUMBER: Regex = Regex::new(r"^[A-Za-z]{2,}-\d+$").expect("valid regex");
    static ref LETTERS_NUMBERS: Regex = Regex::new(r"^[A-Za-z]{2,}\d+$").expect("valid regex");
    static ref NUMBERS_ONLY: Regex = Regex::new(r"^\d+$").expect("valid regex");
    static ref LETTERS_ONLY: Regex = Regex::new(r"^[A-Za-z\s]+$").expect("valid regex");
    static ref ISO_DATE: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}").expect("valid regex");
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%m/%d/%Y"];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Sampled values of one column
#[derive(Debug, Clone)]
pub struct ColumnSample<'a> {
    /// Non-empty values, trimmed
    pub values: Vec<&'a str>,
    /// Rows sampled, including empty cells
    pub sampled_rows: usize,
    /// Distinct non-empty values
    pub distinct: usize,
}

impl<'a> ColumnSample<'a> {
    /// Distinct values relative to sampled rows
    pub fn uniqueness(&self) -> f64 {
        if self.sampled_rows == 0 {
            0.0
        } else {
            self.distinct as f64 / self.sampled_rows as f64
        }
    }

    fn fraction(&self, predicate: impl Fn(&str) -> bool) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let matching = self.values.iter().filter(|v| predicate(v)).count();
        matching as f64 / self.values.len() as f64
    }
}

/// A single classification rule
pub type Rule = fn(&ColumnSample<'_>, &AnalyzerConfig) -> bool;

/// Rules in precedence order; earlier rules win ties
pub const CASCADE: &[(SemanticType, Rule)] = &[
    (SemanticType::Numeric, is_numeric),
    (SemanticType::Date, is_date),
    (SemanticType::Identifier, is_identifier),
    (SemanticType::Categorical, is_categorical),
];

/// Run the cascade; text is the fallback
pub fn classify(sample: &ColumnSample<'_>, config: &AnalyzerConfig) -> SemanticType {
    CASCADE
        .iter()
        .find(|(_, rule)| rule(sample, config))
        .map(|(semantic_type, _)| *semantic_type)
        .unwrap_or(SemanticType::Text)
}

pub fn parses_as_number(value: &str) -> bool {
    value.parse::<f64>().map(|n| n.is_finite()).unwrap_or(false)
}

pub fn parses_as_date(value: &str) -> bool {
    DATE_FORMATS
        .iter()
        .any(|fmt| NaiveDate::parse_from_str(value, fmt).is_ok())
        || DATETIME_FORMATS
            .iter()
            .any(|fmt| NaiveDateTime::parse_from_str(value, fmt).is_ok())
}

/// Alphanumeric code with at least one digit: `PI-1234`, `SKU42`
pub fn looks_like_code(value: &str) -> bool {
    CODE_PATTERN.is_match(value) && value.chars().any(|c| c.is_ascii_digit())
}

pub fn is_numeric(sample: &ColumnSample<'_>, config: &AnalyzerConfig) -> bool {
    !sample.values.is_empty() && sample.fraction(parses_as_number) >= config.numeric_ratio
}

pub fn is_date(sample: &ColumnSample<'_>, config: &AnalyzerConfig) -> bool {
    !sample.values.is_empty() && sample.fraction(parses_as_date) >= config.date_ratio
}

pub fn is_identifier(sample: &ColumnSample<'_>, config: &AnalyzerConfig) -> bool {
    !sample.values.is_empty()
        && sample.uniqueness() >= config.uniqueness_floor
        && sample.fraction(looks_like_code) >= config.code_ratio
}

pub fn is_categorical(sample: &ColumnSample<'_>, config: &AnalyzerConfig) -> bool {
    if sample.values.is_empty() {
        return false;
    }
    let ratio = sample.distinct as f64 / sample.values.len() as f64;
    sample.distinct <= config.categorical_max_distinct && ratio <= config.categorical_max_ratio
}

/// Detect value shapes on the first few values
pub fn detect_patterns(values: &[&str]) -> Vec<ValuePattern> {
    let mut patterns: Vec<ValuePattern> = values
        .iter()
        .take(10)
        .filter_map(|value| {
            if CODE_NUMBER.is_match(value) {
                Some(ValuePattern::CodeNumber)
            } else if ISO_DATE.is_match(value) {
                Some(ValuePattern::DateYyyyMmDd)
            } else if LETTERS_NUMBERS.is_match(value) {
                Some(ValuePattern::LettersNumbers)
            } else if NUMBERS_ONLY.is_match(value) {
                Some(ValuePattern::NumbersOnly)
            } else if LETTERS_ONLY.is_match(value) {
                Some(ValuePattern::LettersOnly)
            } else {
                None
            }
        })
        .collect();
    patterns.sort();
    patterns.dedup();
    patterns
}
