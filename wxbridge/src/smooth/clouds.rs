//! Threshold-based cloud layer smoothing.
//!
//! Layers cannot be interpolated like scalars: a deck either exists or it
//! does not. The rule is driven by `cloud_change_threshold`:
//!
//! - a target layer is added outright only when its base is more than the
//!   threshold from every current layer *and* no current layer shares its
//!   coverage - a genuinely new deck;
//! - a current layer no target layer claims is removed;
//! - a matched pair takes the target's coverage and moves its base toward
//!   the target by at most the threshold per tick.
//!
//! The result is always sorted by ascending base.

use crate::metar::CloudLayer;

pub(super) fn smooth_clouds(
    current: &[CloudLayer],
    target: &[CloudLayer],
    threshold_ft: f32,
) -> Vec<CloudLayer> {
    let mut claimed = vec![false; current.len()];
    let mut out: Vec<CloudLayer> = Vec::with_capacity(target.len());

    for wanted in target {
        let nearest = current
            .iter()
            .enumerate()
            .filter(|(idx, layer)| {
                !claimed[*idx]
                    && ((layer.base_ft - wanted.base_ft).abs() <= threshold_ft
                        || layer.cover == wanted.cover)
            })
            .min_by(|(_, a), (_, b)| {
                let da = (a.base_ft - wanted.base_ft).abs();
                let db = (b.base_ft - wanted.base_ft).abs();
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            });

        match nearest {
            Some((idx, existing)) => {
                claimed[idx] = true;
                let step = (wanted.base_ft - existing.base_ft).clamp(-threshold_ft, threshold_ft);
                out.push(CloudLayer::new(wanted.cover, existing.base_ft + step));
            }
            None => out.push(wanted.clone()),
        }
    }

    out.sort_by(|a, b| a.base_ft.partial_cmp(&b.base_ft).unwrap_or(std::cmp::Ordering::Equal));
    out
}
