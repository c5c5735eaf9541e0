//! Query translation from docwork filter trees to MongoDB query syntax.

use bson::{Document, Bson, doc};
use mongodb::options::FindOptions;

use docwork_core::{
    query::{QueryVisitor, Expr, FieldOp, Query, SortDirection},
    error::DocumentStoreError,
};


/// Translates filter expressions into MongoDB query documents.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    /// Returns the filter document for `query`, matching everything when it has no filter.
    pub fn filter(query: &Query) -> Result<Document, DocumentStoreError> {
        match &query.filter {
            Some(expr) => MongoQueryTranslator.visit_expr(expr),
            None => Ok(doc! {}),
        }
    }

    /// Builds the find options carrying the query's sort keys, pagination and projection.
    pub fn find_options(query: &Query) -> FindOptions {
        let mut options = FindOptions::default();

        options.limit = query.limit.map(|limit| limit as i64);
        options.skip = query.offset.map(|offset| offset as u64);

        if !query.sort.is_empty() {
            options.sort = Some(
                query.sort
                    .iter()
                    .map(|sort| {
                        let direction = match sort.direction {
                            SortDirection::Asc => 1,
                            SortDirection::Desc => -1,
                        };
                        (sort.field.clone(), Bson::Int32(direction))
                    })
                    .collect()
            );
        }

        if let Some(fields) = &query.projection {
            options.projection = Some(
                fields
                    .iter()
                    .map(|field| (field.clone(), Bson::Int32(1)))
                    .collect()
            );
        }

        options
    }
}

fn escape_regex(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// Case-sensitive, like the in-memory evaluator
fn regex(pattern: String) -> Document {
    doc! { "$regex": pattern }
}

fn unsupported(op: &str, expected: &str) -> DocumentStoreError {
    DocumentStoreError::Backend(format!("{op} operator requires {expected} value"))
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    // $not only applies to operator expressions, so negate whole filters with $nor
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$nor": [self.visit_expr(expr)?],
        })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: { "$exists": should_exist },
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: match op {
                FieldOp::Eq => doc! { "$eq": value },
                FieldOp::Ne => doc! { "$ne": value },
                FieldOp::Gt => doc! { "$gt": value },
                FieldOp::Gte => doc! { "$gte": value },
                FieldOp::Lt => doc! { "$lt": value },
                FieldOp::Lte => doc! { "$lte": value },
                FieldOp::Contains => match value {
                    Bson::String(s) => regex(escape_regex(s)),
                    Bson::Array(arr) => doc! { "$all": arr },
                    _ => doc! { "$elemMatch": { "$eq": value } },
                },
                FieldOp::NotContains => match value {
                    Bson::String(s) => doc! { "$not": regex(escape_regex(s)) },
                    Bson::Array(arr) => doc! { "$nin": arr },
                    _ => doc! { "$ne": value },
                },
                FieldOp::StartsWith => match value {
                    Bson::String(s) => regex(format!("^{}", escape_regex(s))),
                    _ => return Err(unsupported("StartsWith", "a string")),
                },
                FieldOp::EndsWith => match value {
                    Bson::String(s) => regex(format!("{}$", escape_regex(s))),
                    _ => return Err(unsupported("EndsWith", "a string")),
                },
                FieldOp::AnyOf => match value {
                    Bson::Array(_) => doc! { "$in": value },
                    _ => doc! { "$in": [value] },
                },
                FieldOp::NoneOf => match value {
                    Bson::Array(_) => doc! { "$nin": value },
                    _ => doc! { "$nin": [value] },
                },
            }
        })
    }
}
