//! Filter evaluation, sorting and projection over in-memory BSON documents.

use std::{cmp::Ordering, collections::HashMap};
use bson::{Bson, Document as BsonDocument, datetime::DateTime};

use docwork_core::{
    query::{Expr, FieldOp, Query, QueryVisitor, Sort, SortDirection},
    error::{DocumentStoreError, DocumentStoreResult},
};


/// Comparable view of a BSON value. Integers and floats compare as `f64`.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect()
            ),
            // Null, binary (including uuids) and the rest compare as null
            _ => Comparable::Null,
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}


pub(crate) struct DocumentEvaluator<'a> {
    document: Option<&'a BsonDocument>,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Bson) -> Self {
        Self { document: document.as_document() }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(expr)
    }

    fn get(&self, field: &str) -> Option<&'a Bson> {
        self.document.and_then(|doc| doc.get(field))
    }
}

impl QueryVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(self.get(field).is_some() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let Some(field_value) = self.get(field) else {
            return Ok(false);
        };
        let left = Comparable::from(field_value);
        let right = Comparable::from(value);

        Ok(match op {
            FieldOp::Eq => left == right,
            FieldOp::Ne => left != right,
            FieldOp::Gt => left.partial_cmp(&right) == Some(Ordering::Greater),
            FieldOp::Gte => matches!(left.partial_cmp(&right), Some(Ordering::Greater | Ordering::Equal)),
            FieldOp::Lt => left.partial_cmp(&right) == Some(Ordering::Less),
            FieldOp::Lte => matches!(left.partial_cmp(&right), Some(Ordering::Less | Ordering::Equal)),
            FieldOp::Contains => contains(&left, &right).unwrap_or(false),
            FieldOp::NotContains => !contains(&left, &right).unwrap_or(false),
            FieldOp::StartsWith => match (left, right) {
                (Comparable::String(left), Comparable::String(right)) => left.starts_with(right),
                _ => false,
            },
            FieldOp::EndsWith => match (left, right) {
                (Comparable::String(left), Comparable::String(right)) => left.ends_with(right),
                _ => false,
            },
            FieldOp::AnyOf => any_of(&left, &right),
            FieldOp::NoneOf => !any_of(&left, &right),
        })
    }
}

/// Substring or array membership; `None` when the operands do not support it.
fn contains(left: &Comparable<'_>, right: &Comparable<'_>) -> Option<bool> {
    match (left, right) {
        (Comparable::Array(array), item) => Some(array.iter().any(|value| value == item)),
        (Comparable::String(left), Comparable::String(right)) => Some(left.contains(*right)),
        _ => None,
    }
}

fn any_of(left: &Comparable<'_>, right: &Comparable<'_>) -> bool {
    match (left, right) {
        (Comparable::Array(array), Comparable::Array(values)) => {
            values.iter().any(|value| array.contains(value))
        },
        (Comparable::Array(array), single) => array.contains(single),
        (single, Comparable::Array(values)) => values.contains(single),
        _ => false,
    }
}

fn sort_key<'a>(document: &'a Bson, field: &str) -> Comparable<'a> {
    document
        .as_document()
        .and_then(|doc| doc.get(field))
        .map(Comparable::from)
        .unwrap_or(Comparable::Null)
}

fn compare_by(sort: &[Sort], a: &Bson, b: &Bson) -> Ordering {
    sort.iter()
        .map(|key| {
            let (left, right) = (sort_key(a, &key.field), sort_key(b, &key.field));
            let ordering = left.partial_cmp(&right).unwrap_or(Ordering::Equal);

            match key.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        })
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

fn project(document: Bson, fields: &[String]) -> Bson {
    match document {
        Bson::Document(doc) => Bson::Document(
            doc
                .into_iter()
                .filter(|(key, _)| fields.iter().any(|field| field == key))
                .collect()
        ),
        other => other,
    }
}

/// Applies a query's filter, sort keys, offset, limit and projection, in that order.
pub(crate) fn apply_query<'a>(
    documents: impl IntoIterator<Item = &'a Bson>,
    query: &Query,
) -> DocumentStoreResult<Vec<Bson>> {
    let mut matched = Vec::new();

    for document in documents {
        let keep = match &query.filter {
            Some(filter) => DocumentEvaluator::new(document).evaluate(filter)?,
            None => true,
        };
        if keep {
            matched.push(document.clone());
        }
    }

    if !query.sort.is_empty() {
        matched.sort_by(|a, b| compare_by(&query.sort, a, b));
    }

    Ok(
        matched
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|document| match &query.projection {
                Some(fields) => project(document, fields),
                None => document,
            })
            .collect()
    )
}


#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docwork_core::query::Filter;

    fn people() -> Vec<Bson> {
        vec![
            Bson::Document(doc! { "name": "ada", "age": 36, "tags": ["math"] }),
            Bson::Document(doc! { "name": "alan", "age": 41, "tags": ["math", "crypto"] }),
            Bson::Document(doc! { "name": "grace", "age": 36 }),
        ]
    }

    fn names(documents: &[Bson]) -> Vec<&str> {
        documents
            .iter()
            .filter_map(|doc| doc.as_document().and_then(|doc| doc.get_str("name").ok()))
            .collect()
    }

    #[test]
    fn evaluates_nested_expressions() {
        let docs = people();
        let filter = Filter::eq("age", 36).and(Filter::contains("tags", "math").not());

        let matched = apply_query(&docs, &Query::filtered(filter)).unwrap();

        assert_eq!(names(&matched), vec!["grace"]);
    }

    #[test]
    fn non_document_values_never_match() {
        let value = Bson::String("loose".to_string());

        assert!(!DocumentEvaluator::new(&value).evaluate(&Filter::exists("name")).unwrap());
        assert!(DocumentEvaluator::new(&value).evaluate(&Filter::not_exists("name")).unwrap());
    }

    #[test]
    fn sorts_by_every_key_then_paginates_and_projects() {
        let docs = people();
        let query = Query::builder()
            .sort("age", SortDirection::Asc)
            .sort("name", SortDirection::Desc)
            .offset(1)
            .limit(2)
            .project(["name"])
            .build();

        let result = apply_query(&docs, &query).unwrap();

        assert_eq!(names(&result), vec!["ada", "alan"]);
        assert_eq!(result[0], Bson::Document(doc! { "name": "ada" }));
    }

    #[test]
    fn string_operators_are_case_sensitive() {
        let docs = people();

        let upper = Filter::contains("name", "AD").or(Filter::starts_with("name", "Gr"));
        let exact = Filter::contains("name", "ad").or(Filter::ends_with("name", "ace"));

        assert!(apply_query(&docs, &Query::filtered(upper)).unwrap().is_empty());
        assert_eq!(names(&apply_query(&docs, &Query::filtered(exact)).unwrap()), vec!["ada", "grace"]);
    }

    #[test]
    fn any_of_matches_scalars_and_arrays() {
        let docs = people();
        let by_name = Filter::any_of("name", vec!["grace", "alan"]);
        let by_tag = Filter::none_of("tags", vec!["crypto"]);

        assert_eq!(names(&apply_query(&docs, &Query::filtered(by_name)).unwrap()), vec!["alan", "grace"]);
        assert_eq!(names(&apply_query(&docs, &Query::filtered(by_tag)).unwrap()), vec!["ada"]);
    }
}
