// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 plugflow contributors

//! Artifact model
//!
//! An [`Artifact`] is an immutable named value. An [`ArtifactBundle`] is the
//! ordered set of artifacts produced by one stage invocation; it is built
//! once and only read afterwards.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::stage::StageId;

/// Opaque tag used for typed lookups
///
/// The core never interprets a kind beyond equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactKind(String);

impl ArtifactKind {
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    /// Kind derived from a Rust type name
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(std::any::type_name::<T>().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArtifactKind {
    fn from(kind: &str) -> Self {
        Self::new(kind)
    }
}

impl From<String> for ArtifactKind {
    fn from(kind: String) -> Self {
        Self(kind)
    }
}

/// A named, immutable value with an optional annotation and kind
#[derive(Clone)]
pub struct Artifact {
    name: String,
    value: Arc<dyn Any + Send + Sync>,
    annotation: Option<String>,
    kind: Option<ArtifactKind>,
}

impl Artifact {
    /// Create an artifact without a declared kind
    pub fn new<V: Any + Send + Sync>(name: impl Into<String>, value: V) -> Self {
        Self {
            name: name.into(),
            value: Arc::new(value),
            annotation: None,
            kind: None,
        }
    }

    /// Create an artifact whose kind is the Rust type name of `value`
    pub fn of<V: Any + Send + Sync>(name: impl Into<String>, value: V) -> Self {
        Self::new(name, value).with_kind(ArtifactKind::of::<V>())
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<ArtifactKind>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// New artifact sharing this artifact's value under a different annotation
    pub fn reannotated(&self, annotation: impl Into<String>) -> Self {
        Self {
            name: self.name.clone(),
            value: Arc::clone(&self.value),
            annotation: Some(annotation.into()),
            kind: self.kind.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn annotation(&self) -> Option<&str> {
        self.annotation.as_deref()
    }

    pub fn kind(&self) -> Option<&ArtifactKind> {
        self.kind.as_ref()
    }

    /// Borrow the value as `T`, if that is what it holds
    pub fn value<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("annotation", &self.annotation)
            .finish_non_exhaustive()
    }
}

/// Ordered artifacts produced by a single stage invocation
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    items: Arc<[Artifact]>,
    producer: Option<StageId>,
}

impl ArtifactBundle {
    pub fn new(items: Vec<Artifact>, producer: StageId) -> Self {
        Self {
            items: items.into(),
            producer: Some(producer),
        }
    }

    /// Bundle injected from outside the graph
    pub fn external(items: Vec<Artifact>) -> Self {
        Self {
            items: items.into(),
            producer: None,
        }
    }

    /// Bundle with nothing in it and no producer
    pub fn empty() -> Self {
        Self::external(Vec::new())
    }

    /// Concatenate bundles, in order, into a new bundle owned by `producer`
    pub fn merge<'a, I>(bundles: I, producer: StageId) -> Self
    where
        I: IntoIterator<Item = &'a ArtifactBundle>,
    {
        let items = bundles
            .into_iter()
            .flat_map(|b| b.items.iter().cloned())
            .collect();

        Self::new(items, producer)
    }

    /// Stage that produced this bundle (`None` for external input)
    pub fn producer(&self) -> Option<StageId> {
        self.producer
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Artifact> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Artifact> {
        self.items.iter()
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.items
    }

    /// All artifacts of the given kind
    pub fn of_kind(&self, kind: &ArtifactKind) -> Vec<&Artifact> {
        self.items
            .iter()
            .filter(|a| a.kind() == Some(kind))
            .collect()
    }

    /// Artifacts of any of the given kinds; an empty list selects everything
    pub fn of_kinds(&self, kinds: &[ArtifactKind]) -> Vec<&Artifact> {
        if kinds.is_empty() {
            return self.items.iter().collect();
        }

        self.items
            .iter()
            .filter(|a| a.kind().is_some_and(|k| kinds.contains(k)))
            .collect()
    }

    /// All artifacts with the given name
    pub fn with_name(&self, name: &str) -> Vec<&Artifact> {
        self.items.iter().filter(|a| a.name() == name).collect()
    }

    /// Artifacts with any of the given names; an empty list selects everything
    pub fn with_names<S: AsRef<str>>(&self, names: &[S]) -> Vec<&Artifact> {
        if names.is_empty() {
            return self.items.iter().collect();
        }

        self.items
            .iter()
            .filter(|a| names.iter().any(|n| n.as_ref() == a.name()))
            .collect()
    }

    /// Artifacts matching both filters (each empty filter matches everything)
    pub fn of_kinds_with_names<S: AsRef<str>>(
        &self,
        kinds: &[ArtifactKind],
        names: &[S],
    ) -> Vec<&Artifact> {
        self.of_kinds(kinds)
            .into_iter()
            .filter(|a| names.is_empty() || names.iter().any(|n| n.as_ref() == a.name()))
            .collect()
    }
}

impl<'a> IntoIterator for &'a ArtifactBundle {
    type Item = &'a Artifact;
    type IntoIter = std::slice::Iter<'a, Artifact>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl fmt::Display for ArtifactBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Bundle ({} artifacts)", self.items.len())?;
        if let Some(producer) = self.producer {
            writeln!(f, "Producer: {}", producer)?;
        }
        for artifact in self.items.iter() {
            let kind = artifact.kind().map(ArtifactKind::as_str).unwrap_or("-");
            writeln!(f, "  name: {}  kind: {}", artifact.name(), kind)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(producer: StageId) -> ArtifactBundle {
        ArtifactBundle::new(
            vec![
                Artifact::of("alignment", String::from("ACGT")),
                Artifact::of("distances", vec![0.5_f64, 1.5]),
                Artifact::new("notes", 7_u32).with_annotation("free text"),
                Artifact::of("alignment", String::from("TTGA")),
            ],
            producer,
        )
    }

    #[test]
    fn test_typed_lookup() {
        let bundle = sample(StageId::next());

        let strings = bundle.of_kind(&ArtifactKind::of::<String>());
        assert_eq!(strings.len(), 2);
        assert_eq!(strings[1].value::<String>().unwrap(), "TTGA");

        // Artifacts without a declared kind never match a kind filter
        let all_kinds = bundle.of_kinds(&[ArtifactKind::of::<String>(), ArtifactKind::of::<Vec<f64>>()]);
        assert_eq!(all_kinds.len(), 3);
    }

    #[test]
    fn test_empty_filters_select_everything() {
        let bundle = sample(StageId::next());
        let no_names: [&str; 0] = [];

        assert_eq!(bundle.of_kinds(&[]).len(), 4);
        assert_eq!(bundle.with_names(&no_names).len(), 4);
    }

    #[test]
    fn test_name_and_kind_filters_combine() {
        let bundle = sample(StageId::next());

        let hits = bundle.of_kinds_with_names(&[ArtifactKind::of::<String>()], &["alignment"]);
        assert_eq!(hits.len(), 2);

        let hits = bundle.of_kinds_with_names(&[ArtifactKind::of::<String>()], &["distances"]);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_merge_preserves_order_and_sets_producer() {
        let first = ArtifactBundle::new(vec![Artifact::new("a", 1)], StageId::next());
        let second = ArtifactBundle::new(
            vec![Artifact::new("b", 2), Artifact::new("c", 3)],
            StageId::next(),
        );
        let merger = StageId::next();

        let merged = ArtifactBundle::merge([&first, &second], merger);

        let names: Vec<_> = merged.iter().map(Artifact::name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(merged.producer(), Some(merger));
        // The inputs are untouched
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 2);
    }

    #[test]
    fn test_value_downcast_and_annotation() {
        let artifact = Artifact::new("count", 42_u32).with_annotation("from test");

        assert_eq!(artifact.value::<u32>(), Some(&42));
        assert!(artifact.value::<i64>().is_none());
        assert_eq!(artifact.annotation(), Some("from test"));
        assert!(artifact.kind().is_none());

        let again = artifact.reannotated("second look");
        assert_eq!(again.annotation(), Some("second look"));
        assert_eq!(again.value::<u32>(), Some(&42));
    }

    #[test]
    fn test_display_lists_artifacts() {
        let text = sample(StageId::next()).to_string();
        assert!(text.contains("Bundle (4 artifacts)"));
        assert!(text.contains("name: notes  kind: -"));
    }
}
