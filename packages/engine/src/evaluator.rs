//! Applying selectors to a storage tree.

use futures::future::{try_join_all, BoxFuture, FutureExt};
use serde_json::Value as JsonValue;
use storeview_core::{
    normalize, EntrySelector, Error, KeyedContainer, NormalizeOptions, Selector, StorageValue,
};
use tracing::{Instrument, Span};

use crate::projection::{FieldError, KeyedEntry, Projection, ProjectionEntry};

/// Settings shared by every projection a `Projector` runs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProjectorOptions {
    pub normalize: NormalizeOptions,
}

/// Evaluates selector lists against storage trees.
///
/// A projector holds no per-request state besides its span, so one instance
/// can serve many projections. Events emitted while projecting are recorded
/// under the span given to `with_span`.
#[derive(Clone, Debug)]
pub struct Projector {
    options: ProjectorOptions,
    span: Span,
}

impl Default for Projector {
    fn default() -> Self {
        Self::new(ProjectorOptions::default())
    }
}

impl Projector {
    pub fn new(options: ProjectorOptions) -> Self {
        Self {
            options,
            span: Span::current(),
        }
    }

    /// Record engine events under `span`, typically one span per request.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn options(&self) -> &ProjectorOptions {
        &self.options
    }

    /// Project `storage` through `selectors`.
    ///
    /// Missing fields, missing keys and type mismatches are reported inside
    /// the returned projection. Anything else (a failed remote lookup, a big
    /// integer the normalizer refuses) aborts the whole projection; it is
    /// logged once here and returned.
    pub async fn project(
        &self,
        selectors: &[Selector],
        storage: &StorageValue,
    ) -> Result<Projection, Error> {
        let result = self
            .project_level(selectors, storage)
            .instrument(self.span.clone())
            .await;

        if let Err(err) = &result {
            self.span.in_scope(|| {
                tracing::error!(
                    selectors = ?selectors,
                    storage = %summarize(storage),
                    error = %err,
                    "unexpected error while projecting contract storage"
                );
            });
        }
        result
    }

    /// Normalize the whole storage tree, for callers that ask for no
    /// particular field.
    pub fn render(&self, storage: &StorageValue) -> Result<JsonValue, Error> {
        self.span.in_scope(|| {
            normalize(storage, &self.options.normalize).inspect_err(|err| {
                tracing::error!(
                    storage = %summarize(storage),
                    error = %err,
                    "unexpected error while rendering contract storage"
                );
            })
        })
    }

    /// One level of selectors over `root`. Nested entry selectors come back
    /// here with the found value as their root.
    fn project_level<'a>(
        &'a self,
        selectors: &'a [Selector],
        root: &'a StorageValue,
    ) -> BoxFuture<'a, Result<Projection, Error>> {
        async move {
            let entries = try_join_all(
                selectors
                    .iter()
                    .filter(|selector| !selector.is_blank())
                    .map(|selector| self.project_selector(selector, root)),
            )
            .await?;
            Ok(entries.into_iter().collect())
        }
        .boxed()
    }

    async fn project_selector(
        &self,
        selector: &Selector,
        root: &StorageValue,
    ) -> Result<ProjectionEntry, Error> {
        match selector {
            Selector::Path(path) => match root.get(path) {
                None | Some(StorageValue::Null) => Ok(ProjectionEntry::error(
                    path.as_str(),
                    FieldError::FieldNotFound,
                )),
                Some(value) => Ok(ProjectionEntry::value(
                    path.as_str(),
                    normalize(value, &self.options.normalize)?,
                )),
            },
            Selector::Container { name, entries } => {
                self.project_container(name, entries, root).await
            }
        }
    }

    async fn project_container(
        &self,
        name: &str,
        entries: &[EntrySelector],
        root: &StorageValue,
    ) -> Result<ProjectionEntry, Error> {
        let value = match root.field(name) {
            None | Some(StorageValue::Null) => {
                return Ok(ProjectionEntry::error(name, FieldError::FieldNotFound))
            }
            Some(value) => value,
        };
        let Some(container) = value.as_container() else {
            return Ok(ProjectionEntry::error(name, FieldError::TypeMismatch));
        };

        tracing::debug!(
            field = name,
            kind = value.kind(),
            keys = entries.len(),
            "reading keys from container"
        );

        let results = try_join_all(
            entries
                .iter()
                .map(|entry| self.project_entry(container, entry)),
        )
        .await?;
        Ok(ProjectionEntry::entries(name, results))
    }

    async fn project_entry(
        &self,
        container: &dyn KeyedContainer,
        entry: &EntrySelector,
    ) -> Result<KeyedEntry, Error> {
        let Some(found) = container.try_get(&entry.key).await? else {
            return Ok(KeyedEntry::error(
                entry.key.clone(),
                FieldError::KeyNotFound,
            ));
        };

        match &entry.selectors {
            Some(nested) => {
                let projection = self.project_level(nested, &found).await?;
                Ok(KeyedEntry::nested(entry.key.clone(), projection))
            }
            None => Ok(KeyedEntry::value(
                entry.key.clone(),
                normalize(&found, &self.options.normalize)?,
            )),
        }
    }
}

/// Short description of a storage tree for log lines. Big trees and remote
/// maps are not worth dumping in full.
fn summarize(storage: &StorageValue) -> String {
    match storage {
        StorageValue::Object(fields) => {
            let names: Vec<&str> = fields.keys().map(String::as_str).collect();
            format!("object {{{}}}", names.join(", "))
        }
        other => other.kind().to_string(),
    }
}
