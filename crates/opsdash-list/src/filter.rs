//! Filter and pagination state, and its two-way mapping to the address query.
//!
//! The address query is the shareable form of a list view: one parameter per
//! allow-listed filter field plus `page` and `pageSize`. [`decode`] and
//! [`encode`] are inverses on allow-listed keys; anything else in the query
//! is ignored.

use crate::error::ValidationError;
use crate::source::ListRequest;
use serde::Serialize;
use std::collections::BTreeMap;

/// Query parameter carrying the 1-based page number.
pub const PAGE_PARAM: &str = "page";
/// Query parameter carrying the page size.
pub const PAGE_SIZE_PARAM: &str = "pageSize";

/// How a filter field's value is validated before it is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text, matched by the backend.
    Text,
    /// A calendar date in `YYYY-MM-DD` form.
    Date,
    /// One of a fixed set of values.
    Choice(&'static [&'static str]),
}

/// One allow-listed filter field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn text(key: &'static str, label: &'static str) -> Self {
        FieldSpec {
            key,
            label,
            kind: FieldKind::Text,
        }
    }

    pub const fn date(key: &'static str, label: &'static str) -> Self {
        FieldSpec {
            key,
            label,
            kind: FieldKind::Date,
        }
    }

    pub const fn choice(
        key: &'static str,
        label: &'static str,
        options: &'static [&'static str],
    ) -> Self {
        FieldSpec {
            key,
            label,
            kind: FieldKind::Choice(options),
        }
    }

    /// Check a trimmed, non-empty value against this field's kind.
    pub fn validate(&self, value: &str) -> Result<(), ValidationError> {
        match self.kind {
            FieldKind::Text => Ok(()),
            FieldKind::Date => value
                .parse::<jiff::civil::Date>()
                .map(|_| ())
                .map_err(|_| ValidationError::InvalidDate {
                    value: value.to_string(),
                }),
            FieldKind::Choice(options) => {
                if options.contains(&value) {
                    Ok(())
                } else {
                    Err(ValidationError::NotAllowed {
                        value: value.to_string(),
                        allowed: options.iter().map(|o| o.to_string()).collect(),
                    })
                }
            }
        }
    }
}

/// Active constraints: field key to value. Absent means unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FilterSet(BTreeMap<String, String>);

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear a constraint. Values are stored trimmed and a blank
    /// value clears. Returns whether anything changed.
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() {
            self.0.remove(key).is_some()
        } else if self.0.get(key).map(String::as_str) == Some(value) {
            false
        } else {
            self.0.insert(key.to_string(), value.to_string());
            true
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FilterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = FilterSet::new();
        for (k, v) in iter {
            set.set(&k.into(), &v.into());
        }
        set
    }
}

/// Current page (1-based) and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

fn query_pairs(query: &str) -> url::form_urlencoded::Parse<'_> {
    url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
}

/// Decode the allow-listed filters from an address query.
///
/// Unknown keys and empty values are ignored; a repeated key keeps its last value.
pub fn decode(query: &str, allowed: &[&str]) -> FilterSet {
    let mut filters = FilterSet::new();
    for (key, value) in query_pairs(query) {
        if allowed.contains(&key.as_ref()) {
            filters.set(&key, &value);
        }
    }
    filters
}

/// Decode pagination, falling back to page 1 and `default_size` when a
/// parameter is absent or not acceptable.
pub fn decode_pagination(query: &str, page_sizes: &[u32], default_size: u32) -> Pagination {
    let mut pagination = Pagination {
        page: 1,
        page_size: default_size,
    };
    for (key, value) in query_pairs(query) {
        match key.as_ref() {
            PAGE_PARAM => {
                if let Some(page) = value.parse::<u32>().ok().filter(|p| *p >= 1) {
                    pagination.page = page;
                }
            }
            PAGE_SIZE_PARAM => {
                if let Some(size) = value.parse::<u32>().ok().filter(|s| page_sizes.contains(s)) {
                    pagination.page_size = size;
                }
            }
            _ => {}
        }
    }
    pagination
}

/// Encode filters and pagination into an address query (no leading `?`).
pub fn encode(filters: &FilterSet, pagination: Pagination) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in filters.iter() {
        serializer.append_pair(key, value);
    }
    serializer.append_pair(PAGE_PARAM, &pagination.page.to_string());
    serializer.append_pair(PAGE_SIZE_PARAM, &pagination.page_size.to_string());
    serializer.finish()
}

/// Holds what the filter inputs show, what is actually applied, and inline
/// validation errors, plus pagination.
///
/// A value that fails validation is kept as a draft with an error next to
/// it; the previously applied value for that field stays in force, so an
/// invalid edit never changes the query.
#[derive(Debug, Clone)]
pub struct FilterStore {
    schema: &'static [FieldSpec],
    draft: BTreeMap<String, String>,
    applied: FilterSet,
    errors: BTreeMap<String, ValidationError>,
    pagination: Pagination,
    page_sizes: Vec<u32>,
}

impl FilterStore {
    /// Build the store from the address present at mount.
    pub fn from_address(
        query: &str,
        schema: &'static [FieldSpec],
        page_sizes: &[u32],
        default_size: u32,
    ) -> Self {
        let keys: Vec<&str> = schema.iter().map(|f| f.key).collect();
        let mut store = FilterStore {
            schema,
            draft: BTreeMap::new(),
            applied: FilterSet::new(),
            errors: BTreeMap::new(),
            pagination: decode_pagination(query, page_sizes, default_size),
            page_sizes: page_sizes.to_vec(),
        };
        for (key, value) in decode(query, &keys).iter() {
            // A bad value in a shared link shows up as an inline error.
            let _ = store.apply(key, value);
        }
        store
    }

    fn spec(&self, key: &str) -> Option<&'static FieldSpec> {
        self.schema.iter().find(|f| f.key == key)
    }

    fn apply(&mut self, key: &str, raw: &str) -> Result<bool, ValidationError> {
        let spec = self
            .spec(key)
            .ok_or_else(|| ValidationError::UnknownField(key.to_string()))?;

        if raw.is_empty() {
            self.draft.remove(key);
        } else {
            self.draft.insert(key.to_string(), raw.to_string());
        }

        let value = raw.trim();
        if !value.is_empty() {
            if let Err(err) = spec.validate(value) {
                self.errors.insert(key.to_string(), err.clone());
                return Err(err);
            }
        }
        self.errors.remove(key);
        Ok(self.applied.set(key, value))
    }

    /// Edit one filter field. Returns whether the applied filters changed;
    /// when they did, the page goes back to 1.
    pub fn set_filter(&mut self, key: &str, value: &str) -> Result<bool, ValidationError> {
        let changed = self.apply(key, value)?;
        if changed {
            self.pagination.page = 1;
        }
        Ok(changed)
    }

    /// Remove every constraint and inline error.
    pub fn clear(&mut self) -> bool {
        let changed = !self.applied.is_empty();
        self.applied = FilterSet::new();
        self.draft.clear();
        self.errors.clear();
        if changed {
            self.pagination.page = 1;
        }
        changed
    }

    pub fn set_page(&mut self, page: u32) -> Result<bool, ValidationError> {
        if page == 0 {
            return Err(ValidationError::Page);
        }
        let changed = self.pagination.page != page;
        self.pagination.page = page;
        Ok(changed)
    }

    pub fn set_page_size(&mut self, size: u32) -> Result<bool, ValidationError> {
        if !self.page_sizes.contains(&size) {
            return Err(ValidationError::PageSize(size));
        }
        let changed = self.pagination.page_size != size;
        if changed {
            self.pagination.page_size = size;
            self.pagination.page = 1;
        }
        Ok(changed)
    }

    /// Pull the page back inside `1..=total_pages`. Returns whether it moved.
    pub fn clamp_page(&mut self, total_pages: u32) -> bool {
        let last = total_pages.max(1);
        if self.pagination.page > last {
            self.pagination.page = last;
            true
        } else {
            false
        }
    }

    /// The page size after `current` in the offered list, wrapping around.
    pub fn next_page_size(&self) -> u32 {
        let idx = self
            .page_sizes
            .iter()
            .position(|s| *s == self.pagination.page_size)
            .map_or(0, |i| (i + 1) % self.page_sizes.len());
        self.page_sizes
            .get(idx)
            .copied()
            .unwrap_or(self.pagination.page_size)
    }

    /// The request the current state describes.
    pub fn request(&self) -> ListRequest {
        ListRequest {
            page: self.pagination.page,
            page_size: self.pagination.page_size,
            filters: self.applied.clone(),
        }
    }

    /// The address query for the current state.
    pub fn address(&self) -> String {
        encode(&self.applied, self.pagination)
    }

    /// What the input for `key` shows (may be invalid).
    pub fn draft(&self, key: &str) -> &str {
        self.draft.get(key).map_or("", String::as_str)
    }

    pub fn error(&self, key: &str) -> Option<&ValidationError> {
        self.errors.get(key)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn applied(&self) -> &FilterSet {
        &self.applied
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn schema(&self) -> &'static [FieldSpec] {
        self.schema
    }
}
