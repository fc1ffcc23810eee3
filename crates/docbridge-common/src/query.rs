//! Projection, sort and find options shared by every adapter

use bson::{doc, Document as BsonDocument};

/// Sort direction for a single field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// Wire value understood by the engine (`1` / `-1`)
    pub fn as_i32(self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }
}

/// Ordered list of `(field, direction)` pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec {
    fields: Vec<(String, SortDirection)>,
}

impl SortSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ascending(self, field: impl Into<String>) -> Self {
        self.then(field, SortDirection::Ascending)
    }

    pub fn descending(self, field: impl Into<String>) -> Self {
        self.then(field, SortDirection::Descending)
    }

    /// Append a sort key; earlier keys take precedence
    pub fn then(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.fields.push((field.into(), direction));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[(String, SortDirection)] {
        &self.fields
    }

    pub fn to_document(&self) -> BsonDocument {
        let mut sort = BsonDocument::new();
        for (field, direction) in &self.fields {
            sort.insert(field.clone(), direction.as_i32());
        }
        sort
    }
}

impl<S: Into<String>> FromIterator<(S, SortDirection)> for SortSpec {
    fn from_iter<I: IntoIterator<Item = (S, SortDirection)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(f, d)| (f.into(), d)).collect(),
        }
    }
}

/// Set of fields to return; `_id` follows the engine default
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    fields: Vec<String>,
}

impl Projection {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut projection = Self::default();
        for field in fields {
            let field = field.into();
            if !projection.fields.contains(&field) {
                projection.fields.push(field);
            }
        }
        projection
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    /// Renders as `{field: 1, ...}`
    pub fn to_document(&self) -> BsonDocument {
        let mut projection = BsonDocument::new();
        for field in &self.fields {
            projection.insert(field.clone(), 1);
        }
        projection
    }
}

/// Options for a cursor-returning find
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindSpec {
    pub projection: Option<Projection>,
    pub sort: SortSpec,
    /// Maximum number of documents; 0 means unlimited
    pub limit: i64,
}

impl FindSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Limit to send to the engine, `None` when unlimited
    pub fn effective_limit(&self) -> Option<i64> {
        (self.limit != 0).then_some(self.limit)
    }

    /// Options used by find-last: sorted descending on one field, first hit only
    pub fn last_by(sort_field: &str, projection: Option<Projection>) -> Self {
        Self {
            projection,
            sort: SortSpec::new().descending(sort_field),
            limit: 1,
        }
    }
}

/// `{"$set": values}`, so updates merge into the stored document
pub fn set_update(values: BsonDocument) -> BsonDocument {
    doc! { "$set": values }
}
