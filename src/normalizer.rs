//! Column normalization and type coercion.
//!
//! Applies the static tables from [`crate::schema`] to a frame as lazy
//! column expressions: rename raw columns to canonical names, derive the
//! `uf` state code from `municipio`, then repair and cast the numeric
//! columns. Every step is a pure `LazyFrame -> LazyFrame` transformation,
//! so the engine is free to run it over any number of rows.
//!
//! Renaming must happen first; the derive and cast steps address columns
//! by canonical name only.

use crate::constants::{MUNICIPIO_COLUMN, UF_COLUMN, UF_PREFIX_LEN};
use crate::error::{RaisError, Result};
use crate::models::{CastFailure, CastRule, CastTarget};
use crate::schema::{ColumnMapping, RAIS_2020_CASTS, RenamePlan};
use polars::prelude::*;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Stateless normalizer built from a validated mapping and cast table
#[derive(Debug, Clone)]
pub struct ColumnNormalizer {
    mapping: ColumnMapping,
    cast_rules: Vec<CastRule>,
}

impl ColumnNormalizer {
    /// Combine a mapping with cast rules, checking that every rule targets a
    /// canonical column exactly once and that `uf` stays free for derivation
    pub fn new(mapping: ColumnMapping, cast_rules: &[CastRule]) -> Result<Self> {
        if mapping.is_canonical(UF_COLUMN) {
            return Err(RaisError::InvalidMapping {
                reason: format!("'{}' is derived and cannot be a rename target", UF_COLUMN),
            });
        }
        if !mapping.is_canonical(MUNICIPIO_COLUMN) {
            return Err(RaisError::InvalidMapping {
                reason: format!("no rule produces '{}'", MUNICIPIO_COLUMN),
            });
        }

        let mut seen = HashSet::new();
        for rule in cast_rules {
            if !mapping.is_canonical(rule.column) {
                return Err(RaisError::InvalidMapping {
                    reason: format!("cast rule targets non-canonical column '{}'", rule.column),
                });
            }
            if !seen.insert(rule.column) {
                return Err(RaisError::InvalidMapping {
                    reason: format!("column '{}' has more than one cast rule", rule.column),
                });
            }
        }

        Ok(Self {
            mapping,
            cast_rules: cast_rules.to_vec(),
        })
    }

    /// Normalizer for the RAIS 2020 vínculos layout
    pub fn rais_2020() -> Result<Self> {
        Self::new(ColumnMapping::rais_2020()?, RAIS_2020_CASTS)
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    pub fn cast_rules(&self) -> &[CastRule] {
        &self.cast_rules
    }

    /// Work out how the columns of `lf` would be renamed
    pub fn plan_rename(&self, lf: &mut LazyFrame) -> Result<RenamePlan> {
        let columns = column_names(lf)?;

        let already_canonical = !columns.is_empty()
            && columns
                .iter()
                .all(|name| self.mapping.is_canonical(name) || name == UF_COLUMN);
        if already_canonical {
            debug!("All {} columns already canonical", columns.len());
            return Ok(RenamePlan::identity(&columns));
        }

        self.mapping.resolve(&columns)
    }

    /// Give every mapped column its canonical name; values are untouched
    pub fn rename(&self, mut lf: LazyFrame) -> Result<LazyFrame> {
        let plan = self.plan_rename(&mut lf)?;

        if !plan.unmapped().is_empty() {
            warn!(
                "{} columns have no canonical name and pass through unchanged: {:?}",
                plan.unmapped().len(),
                plan.unmapped()
            );
        }
        if plan.is_identity() {
            return Ok(lf);
        }

        let exprs: Vec<Expr> = plan
            .pairs()
            .iter()
            .map(|(source, output)| col(source.as_str()).alias(output.as_str()))
            .collect();

        Ok(lf.select(exprs))
    }

    /// Add `uf`, the integer formed by the first two characters of `municipio`
    pub fn derive_uf(&self, mut lf: LazyFrame) -> Result<LazyFrame> {
        require_columns(&mut lf, &[MUNICIPIO_COLUMN], "uf derivation")?;
        Ok(lf.with_column(uf_expr()))
    }

    /// Coerce every cast column; unparseable values become null
    pub fn cast_numeric(&self, mut lf: LazyFrame) -> Result<LazyFrame> {
        let columns: Vec<&str> = self.cast_rules.iter().map(|rule| rule.column).collect();
        require_columns(&mut lf, &columns, "numeric cast")?;

        let exprs: Vec<Expr> = self
            .cast_rules
            .iter()
            .map(|rule| cast_expr(rule).alias(rule.column))
            .collect();

        Ok(lf.with_columns(exprs))
    }

    /// Full normalization in the required order: rename, derive, cast
    pub fn normalize(&self, lf: LazyFrame) -> Result<LazyFrame> {
        let renamed = self.rename(lf)?;
        let derived = self.derive_uf(renamed)?;
        self.cast_numeric(derived)
    }

    /// Count, per cast column, values that are present before the cast and
    /// null after it. Expects a renamed, not yet cast frame.
    pub fn count_cast_failures(&self, mut lf: LazyFrame) -> Result<Vec<CastFailure>> {
        let columns: Vec<&str> = self.cast_rules.iter().map(|rule| rule.column).collect();
        require_columns(&mut lf, &columns, "numeric cast")?;

        let exprs: Vec<Expr> = self
            .cast_rules
            .iter()
            .map(|rule| {
                col(rule.column)
                    .is_not_null()
                    .and(cast_expr(rule).is_null())
                    .sum()
                    .alias(rule.column)
            })
            .collect();

        let counts = lf.select(exprs).collect()?;

        let mut failures = Vec::new();
        for rule in &self.cast_rules {
            let count = counts
                .column(rule.column)?
                .get(0)?
                .try_extract::<u64>()?;
            if count > 0 {
                failures.push(CastFailure {
                    column: rule.column.to_string(),
                    count,
                });
            }
        }

        Ok(failures)
    }
}

/// Expression computing `uf` from `municipio`.
///
/// Null when `municipio` is null, shorter than two characters, or when
/// its first two characters are not an integer.
pub fn uf_expr() -> Expr {
    let text = col(MUNICIPIO_COLUMN).cast(DataType::String);

    when(text.clone().str().len_chars().gt_eq(lit(UF_PREFIX_LEN)))
        .then(
            text.str()
                .slice(lit(0), lit(UF_PREFIX_LEN))
                .cast(DataType::Int32),
        )
        .otherwise(lit(NULL).cast(DataType::Int32))
        .alias(UF_COLUMN)
}

/// Expression coercing one column according to its rule
pub fn cast_expr(rule: &CastRule) -> Expr {
    let text = col(rule.column).cast(DataType::String);

    match rule.target {
        CastTarget::Int => text.cast(rule.target.data_type()),
        CastTarget::DecimalComma => text
            .str()
            .replace_all(lit(","), lit("."), true)
            .cast(rule.target.data_type()),
    }
}

fn column_names(lf: &mut LazyFrame) -> Result<Vec<String>> {
    let schema = lf.collect_schema()?;
    Ok(schema.iter_names().map(|name| name.to_string()).collect())
}

fn require_columns(lf: &mut LazyFrame, required: &[&str], required_by: &str) -> Result<()> {
    let schema = lf.collect_schema()?;
    for column in required {
        if schema.get(column).is_none() {
            return Err(RaisError::MissingColumn {
                column: column.to_string(),
                required_by: required_by.to_string(),
            });
        }
    }
    Ok(())
}
