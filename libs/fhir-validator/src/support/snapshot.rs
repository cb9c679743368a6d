//! Snapshot generation for differential-only StructureDefinitions
//!
//! Profile packages frequently ship differentials only. The generator resolves
//! the base definition through the chain (materializing it first when it is
//! itself differential-only) and merges the differential onto its snapshot.
//! Results are cached per versioned canonical URL.

use super::{SupportChain, ValidationSupport};
use crate::error::SnapshotError;
use erx_models::{ElementDefinition, Snapshot, StructureDefinition};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

#[derive(Debug, Default)]
pub struct SnapshotGeneratingSupport {
    materialized: RwLock<HashMap<String, Arc<StructureDefinition>>>,
}

impl SnapshotGeneratingSupport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached snapshots
    pub fn cached(&self) -> usize {
        self.materialized.read().map(|m| m.len()).unwrap_or(0)
    }

    fn materialize(
        &self,
        chain: &SupportChain,
        sd: &Arc<StructureDefinition>,
        stack: &mut HashSet<String>,
    ) -> Result<Arc<StructureDefinition>, SnapshotError> {
        if sd.has_snapshot() {
            return Ok(Arc::clone(sd));
        }

        let key = sd.versioned_url();
        if let Some(hit) = self
            .materialized
            .read()
            .ok()
            .and_then(|m| m.get(&key).cloned())
        {
            return Ok(hit);
        }

        if !stack.insert(key.clone()) {
            return Err(SnapshotError::Circular(key));
        }

        let result = (|| -> Result<StructureDefinition, SnapshotError> {
            if sd.differential_elements().is_empty() {
                return Err(SnapshotError::MissingDifferential(key.clone()));
            }
            let base_url = sd
                .base_definition
                .as_deref()
                .ok_or_else(|| SnapshotError::MissingBaseDefinition(key.clone()))?;
            let base = chain
                .fetch_structure_definition(base_url)
                .ok_or_else(|| SnapshotError::BaseNotFound(base_url.to_string()))?;
            let base = self.materialize(chain, &base, stack)?;

            let mut generated = (**sd).clone();
            generated.snapshot = Some(Snapshot {
                element: merge_differential(base.snapshot_elements(), sd.differential_elements()),
            });
            Ok(generated)
        })();

        stack.remove(&key);

        let generated = Arc::new(result?);
        tracing::debug!(url = %key, elements = generated.snapshot_elements().len(), "Generated snapshot");
        if let Ok(mut m) = self.materialized.write() {
            m.insert(key, Arc::clone(&generated));
        }
        Ok(generated)
    }
}

impl ValidationSupport for SnapshotGeneratingSupport {
    fn name(&self) -> String {
        "snapshot generator".to_string()
    }

    fn generate_snapshot(
        &self,
        chain: &SupportChain,
        sd: &Arc<StructureDefinition>,
    ) -> Option<Result<Arc<StructureDefinition>, SnapshotError>> {
        Some(self.materialize(chain, sd, &mut HashSet::new()))
    }
}

fn element_key(element: &ElementDefinition) -> &str {
    element.id.as_deref().unwrap_or(&element.path)
}

/// The element a new differential element is placed after: its unsliced
/// element for a slice, its parent otherwise
fn anchor_of(key: &str) -> &str {
    let last_segment = key.rfind('.').map(|pos| pos + 1).unwrap_or(0);
    match key[last_segment..].find(':') {
        Some(colon) => &key[..last_segment + colon],
        None => &key[..last_segment.saturating_sub(1)],
    }
}

/// Overlay the differential onto a copy of the base snapshot.
///
/// Differential elements replace the constraints they set on the matching base
/// element (by id, falling back to path). Elements the base does not define are
/// inserted after the last element below their anchor.
pub fn merge_differential(
    base: &[ElementDefinition],
    differential: &[ElementDefinition],
) -> Vec<ElementDefinition> {
    let mut elements = base.to_vec();

    for diff in differential {
        let key = element_key(diff);
        if let Some(existing) = elements.iter_mut().find(|e| element_key(e) == key) {
            overlay(existing, diff);
            continue;
        }

        let anchor = anchor_of(key);
        let position = elements
            .iter()
            .rposition(|e| {
                let id = element_key(e);
                id == anchor
                    || id
                        .strip_prefix(anchor)
                        .is_some_and(|rest| rest.starts_with('.') || rest.starts_with(':'))
            })
            .map(|i| i + 1)
            .unwrap_or(elements.len());

        let mut added = diff.clone();
        added.id.get_or_insert_with(|| diff.path.clone());
        elements.insert(position, added);
    }

    elements
}

fn overlay(target: &mut ElementDefinition, diff: &ElementDefinition) {
    if diff.min.is_some() {
        target.min = diff.min;
    }
    if diff.max.is_some() {
        target.max = diff.max.clone();
    }
    if !diff.types.is_empty() {
        target.types = diff.types.clone();
    }
    if diff.binding.is_some() {
        target.binding = diff.binding.clone();
    }
    if diff.slicing.is_some() {
        target.slicing = diff.slicing.clone();
    }
    if diff.must_support.is_some() {
        target.must_support = diff.must_support;
    }
    if diff.fixed_value().is_some() {
        target.extensions.retain(|k, _| !k.starts_with("fixed"));
    }
    if diff.pattern_value().is_some() {
        target.extensions.retain(|k, _| !k.starts_with("pattern"));
    }
    for (k, v) in &diff.extensions {
        target.extensions.insert(k.clone(), v.clone());
    }
}
