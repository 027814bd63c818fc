//! Weight-based cleanup passes over a binding's membership records.

use serde::Serialize;

use crate::scene::node::NodeId;

use super::binding::Binding;
use super::error::SkinResult;
use super::ids::RecordKey;
use super::membership::MembershipMode;
use super::solver::Coordinates;

/// What a pruning pass touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub records_visited: usize,
    pub weights_zeroed: usize,
    pub members_removed: usize,
}

/// Existing records matching both filters. Empty filters match everything.
fn matching_records(
    binding: &Binding,
    geometry_filter: &[NodeId],
    influence_filter: &[NodeId],
) -> SkinResult<Vec<RecordKey>> {
    let geometry = binding.resolve_geometry_filter(geometry_filter)?;
    let influences = binding.resolve_influence_filter(influence_filter)?;
    Ok(binding
        .store()
        .keys()
        .into_iter()
        .filter(|(gi, ii)| {
            geometry.iter().any(|(_, g)| g == gi) && influences.contains(ii)
        })
        .collect())
}

/// Set every weight below `threshold` to zero. Membership is left as is.
pub fn prune_small_weights(
    binding: &mut Binding,
    geometry_filter: &[NodeId],
    influence_filter: &[NodeId],
    threshold: f64,
) -> SkinResult<PruneReport> {
    let keys = matching_records(binding, geometry_filter, influence_filter)?;
    let mut report = PruneReport::default();

    for key in keys {
        let store = binding.store_mut();
        store.validate(key)?;
        report.records_visited += 1;

        let mut weights = store.get_weight_array(key).to_vec();
        let mut zeroed = 0;
        for w in weights.iter_mut().filter(|w| **w < threshold && **w != 0.0) {
            *w = 0.0;
            zeroed += 1;
        }
        if zeroed > 0 {
            store.set_weight_array(key, weights);
            report.weights_zeroed += zeroed;
        }
    }

    log::debug!(
        "binding '{}': zeroed {} weight(s) below {threshold}",
        binding.name(),
        report.weights_zeroed
    );
    Ok(report)
}

/// Remove every member whose weight is below `threshold`.
pub fn prune_membership_by_weights(
    binding: &mut Binding,
    geometry_filter: &[NodeId],
    influence_filter: &[NodeId],
    threshold: f64,
) -> SkinResult<PruneReport> {
    let keys = matching_records(binding, geometry_filter, influence_filter)?;
    let mut report = PruneReport::default();

    for key in keys {
        let store = binding.store_mut();
        store.validate(key)?;
        report.records_visited += 1;

        let doomed: Vec<usize> = store
            .get_index_array(key)
            .iter()
            .zip(store.get_weight_array(key))
            .filter(|(_, w)| **w < threshold)
            .map(|(c, _)| *c)
            .collect();
        if doomed.is_empty() {
            continue;
        }
        store.update(key, &doomed, 0.0, MembershipMode::Remove, |_| {
            Ok(Coordinates::new())
        })?;
        report.members_removed += doomed.len();
    }

    log::debug!(
        "binding '{}': removed {} member(s) below {threshold}",
        binding.name(),
        report.members_removed
    );
    Ok(report)
}
