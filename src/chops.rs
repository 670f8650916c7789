//! Priority-chop assignment over tessellated cells
//!
//! Cells are grouped by their split key and, per group, bucketed into
//! area-bounded tranches by descending priority score. A refinement pass
//! then enforces that no two cells of the same tranche touch: within each
//! tranche the best mutually non-adjacent subset is kept, conflicting
//! cells are demoted to the overflow tranche, and freed quota is refilled
//! greedily from lower tranches and the overflow.
//!
//! The search is exhaustive over small conflict clusters and degrades to
//! single-cell candidates for large ones, with a hard cap on evaluated
//! combinations, so a pathological adjacency graph can slow the pass down
//! but never hang it.

use std::collections::{BTreeMap, BTreeSet};

use geo::coordinate_position::CoordPos;
use geo::dimensions::Dimensions;
use geo::{Intersects, Polygon, Relate};
use log::{debug, warn};

/// Clusters larger than this enumerate only single-cell demotion
/// candidates instead of every independent subset
const MAX_ENUMERATED_CLUSTER: usize = 12;

/// Cap on demotion candidates evaluated per tranche
const MAX_CANDIDATES: usize = 100_000;

/// One cell as seen by the chop assignment
#[derive(Debug, Clone)]
pub struct ChopCell<'a> {
    /// Cell polygon, used only for adjacency
    pub geometry: &'a Polygon<f64>,
    /// Split-key attribute values; cells are partitioned by this key
    pub key: Vec<String>,
    /// Priority value of the cell
    pub value: f64,
    /// Cell area as a percentage of its parent split feature
    pub area: f64,
}

/// Tranche numbers per cell, before and after conflict resolution
///
/// Numbers are 1-based; `0` is the overflow tranche.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChopAssignments {
    pub initial: Vec<u32>,
    pub final_chops: Vec<u32>,
}

/// Decide whether two cells count as neighbors
///
/// With `corners` any touch counts, including a single shared point.
/// Without it only overlapping interiors or a shared boundary segment
/// count; point contacts are ignored.
pub fn adjacent(a: &Polygon<f64>, b: &Polygon<f64>, corners: bool) -> bool {
    if corners {
        return a.intersects(b);
    }
    let matrix = a.relate(b);
    matrix.get(CoordPos::Inside, CoordPos::Inside) != Dimensions::Empty
        || matrix.get(CoordPos::OnBoundary, CoordPos::OnBoundary) == Dimensions::OneDimensional
}

/// Assign every cell to a chop tranche
///
/// `divisions` holds the ordered area quotas in the same unit as the cell
/// areas. Output order follows the input cells.
pub fn assign_chops(
    cells: &[ChopCell],
    divisions: &[f64],
    neighbor_corners: bool,
) -> ChopAssignments {
    let overflow = divisions.len();
    let scores: Vec<f64> = cells.iter().map(|cell| cell.value * cell.area).collect();

    let mut groups: BTreeMap<&[String], Vec<usize>> = BTreeMap::new();
    for (index, cell) in cells.iter().enumerate() {
        groups.entry(&cell.key).or_default().push(index);
    }

    let mut initial = vec![overflow; cells.len()];
    let mut final_tranches = vec![overflow; cells.len()];
    for (key, members) in &groups {
        debug!(
            "assigning chops for split key {:?} over {} cells",
            key,
            members.len()
        );
        let tranches = bucket_by_priority(members, &scores, cells, divisions);
        for (&index, &tranche) in members.iter().zip(&tranches) {
            initial[index] = tranche;
        }
        let neighbors = group_neighbors(members, cells, neighbor_corners);
        resolve_conflicts(
            members,
            cells,
            &scores,
            divisions,
            &initial,
            &neighbors,
            &mut final_tranches,
        );
    }

    ChopAssignments {
        initial: initial.iter().map(|&t| to_number(t, overflow)).collect(),
        final_chops: final_tranches
            .iter()
            .map(|&t| to_number(t, overflow))
            .collect(),
    }
}

fn to_number(tranche: usize, overflow: usize) -> u32 {
    if tranche < overflow {
        tranche as u32 + 1
    } else {
        0
    }
}

/// Bucket a group's cells into tranches by descending priority score
///
/// Returns one tranche index per group member, aligned with `members`.
/// The running area total advances to the next tranche when it exceeds
/// the quota, except when a single cell alone does so; that cell stays.
fn bucket_by_priority(
    members: &[usize],
    scores: &[f64],
    cells: &[ChopCell],
    divisions: &[f64],
) -> Vec<usize> {
    let overflow = divisions.len();
    let mut order: Vec<usize> = (0..members.len()).collect();
    order.sort_by(|&a, &b| descending(scores[members[a]], scores[members[b]]));

    let mut tranches = vec![overflow; members.len()];
    let mut tranche = 0usize;
    let mut running_area = 0.0;
    for &slot in &order {
        let cell_area = cells[members[slot]].area;
        running_area += cell_area;
        let limit = divisions.get(tranche).copied().unwrap_or(f64::INFINITY);
        if running_area > limit && running_area != cell_area {
            tranche += 1;
            running_area = cell_area;
        }
        tranches[slot] = tranche.min(overflow);
    }
    tranches
}

/// Descending order with NaN scores sorted last
fn descending(a: f64, b: f64) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// Pairwise adjacency within one split group
fn group_neighbors(
    members: &[usize],
    cells: &[ChopCell],
    corners: bool,
) -> BTreeMap<usize, BTreeSet<usize>> {
    let mut neighbors: BTreeMap<usize, BTreeSet<usize>> =
        members.iter().map(|&m| (m, BTreeSet::new())).collect();
    for (offset, &a) in members.iter().enumerate() {
        for &b in &members[offset + 1..] {
            if adjacent(cells[a].geometry, cells[b].geometry, corners) {
                if let Some(set) = neighbors.get_mut(&a) {
                    set.insert(b);
                }
                if let Some(set) = neighbors.get_mut(&b) {
                    set.insert(a);
                }
            }
        }
    }
    neighbors
}

/// Refine one group's tranches so no two same-tranche cells touch
///
/// Every cell starts in the overflow tranche; tranches are then filled
/// from the first quota down, each keeping its best conflict-free subset
/// and topping up from the tranches below it.
fn resolve_conflicts(
    members: &[usize],
    cells: &[ChopCell],
    scores: &[f64],
    divisions: &[f64],
    initial: &[usize],
    neighbors: &BTreeMap<usize, BTreeSet<usize>>,
    final_tranches: &mut [usize],
) {
    let overflow = divisions.len();
    let mut tranche_sets: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); overflow + 1];
    for &index in members {
        tranche_sets[initial[index]].insert(index);
    }

    for tranche in 0..overflow {
        let quota = divisions[tranche];
        let chop_set = tranche_sets[tranche].clone();
        let clusters = conflict_clusters(&chop_set, neighbors);
        let clustered: BTreeSet<usize> = clusters.iter().flatten().copied().collect();
        let free: BTreeSet<usize> = chop_set.difference(&clustered).copied().collect();

        let candidate_lists: Vec<Vec<Vec<usize>>> = clusters
            .iter()
            .map(|cluster| cluster_subsets(cluster, neighbors))
            .collect();

        let mut best: Option<(f64, BTreeSet<usize>, BTreeSet<usize>)> = None;
        let mut evaluated = 0usize;
        let mut cursor = vec![0usize; candidate_lists.len()];
        'combinations: loop {
            let mut kept = free.clone();
            for (list, &pick) in candidate_lists.iter().zip(&cursor) {
                kept.extend(list[pick].iter().copied());
            }
            if !has_adjacent_pair(&kept, neighbors) {
                let kept_value: f64 = kept.iter().map(|&i| finite_score(scores, i)).sum();
                let kept_area: f64 = kept.iter().map(|&i| cells[i].area).sum();
                let excluded: BTreeSet<usize> = kept
                    .iter()
                    .flat_map(|i| neighbors[i].iter().copied())
                    .collect();
                let pool: BTreeSet<usize> = tranche_sets[tranche + 1..]
                    .iter()
                    .flatten()
                    .copied()
                    .filter(|index| !excluded.contains(index))
                    .collect();
                let (fill_value, fill) =
                    best_fill(&pool, kept_area, quota, cells, scores, neighbors);
                let total = kept_value + fill_value;
                if best.as_ref().map_or(true, |(value, _, _)| total > *value) {
                    best = Some((total, kept, fill));
                }
            }

            evaluated += 1;
            if evaluated >= MAX_CANDIDATES {
                warn!(
                    "chop refinement stopped after {} candidates in tranche {}",
                    evaluated,
                    tranche + 1
                );
                break;
            }
            // Odometer over the per-cluster candidate lists
            let mut dimension = cursor.len();
            loop {
                if dimension == 0 {
                    break 'combinations;
                }
                dimension -= 1;
                cursor[dimension] += 1;
                if cursor[dimension] < candidate_lists[dimension].len() {
                    break;
                }
                cursor[dimension] = 0;
            }
        }

        let (kept, promoted) = match best {
            Some((_, kept, promoted)) => (kept, promoted),
            None => (chop_set.clone(), BTreeSet::new()),
        };
        for &index in &kept {
            final_tranches[index] = tranche;
        }
        for index in chop_set.difference(&kept) {
            final_tranches[*index] = overflow;
            tranche_sets[tranche].remove(index);
            tranche_sets[overflow].insert(*index);
        }
        for &index in &promoted {
            final_tranches[index] = tranche;
            tranche_sets[initial[index]].remove(&index);
            tranche_sets[overflow].remove(&index);
            tranche_sets[tranche].insert(index);
        }
    }
}

/// Connected components of the adjacency graph induced on `chop_set`
///
/// Cells without a same-tranche neighbor belong to no cluster.
fn conflict_clusters(
    chop_set: &BTreeSet<usize>,
    neighbors: &BTreeMap<usize, BTreeSet<usize>>,
) -> Vec<BTreeSet<usize>> {
    let mut clusters = Vec::new();
    let mut unvisited = chop_set.clone();
    while let Some(&seed) = unvisited.iter().next() {
        unvisited.remove(&seed);
        let mut frontier: Vec<usize> = neighbors[&seed]
            .intersection(chop_set)
            .copied()
            .collect();
        if frontier.is_empty() {
            continue;
        }
        let mut cluster = BTreeSet::from([seed]);
        while let Some(index) = frontier.pop() {
            if !cluster.insert(index) {
                continue;
            }
            for &next in neighbors[&index].intersection(chop_set) {
                if !cluster.contains(&next) {
                    frontier.push(next);
                }
            }
        }
        for index in &cluster {
            unvisited.remove(index);
        }
        clusters.push(cluster);
    }
    clusters
}

/// All internally non-adjacent proper subsets of a cluster, by ascending
/// size then lexicographic member order
fn cluster_subsets(
    cluster: &BTreeSet<usize>,
    neighbors: &BTreeMap<usize, BTreeSet<usize>>,
) -> Vec<Vec<usize>> {
    let members: Vec<usize> = cluster.iter().copied().collect();
    if members.len() > MAX_ENUMERATED_CLUSTER {
        return members.iter().map(|&index| vec![index]).collect();
    }
    let mut subsets = Vec::new();
    for count in 1..members.len() {
        for_each_combination(members.len(), count, |slots| {
            let subset: Vec<usize> = slots.iter().map(|&slot| members[slot]).collect();
            let independent = subset.iter().enumerate().all(|(offset, a)| {
                subset[offset + 1..].iter().all(|b| !neighbors[a].contains(b))
            });
            if independent {
                subsets.push(subset);
            }
        });
    }
    subsets
}

/// Visit every `count`-combination of `0..n` in lexicographic order
fn for_each_combination(n: usize, count: usize, mut visit: impl FnMut(&[usize])) {
    if count > n || count == 0 {
        return;
    }
    let mut slots: Vec<usize> = (0..count).collect();
    loop {
        visit(&slots);
        let mut dimension = count;
        loop {
            if dimension == 0 {
                return;
            }
            dimension -= 1;
            if slots[dimension] != dimension + n - count {
                break;
            }
        }
        slots[dimension] += 1;
        for next in dimension + 1..count {
            slots[next] = slots[next - 1] + 1;
        }
    }
}

fn has_adjacent_pair(set: &BTreeSet<usize>, neighbors: &BTreeMap<usize, BTreeSet<usize>>) -> bool {
    set.iter()
        .any(|index| !neighbors[index].is_disjoint(set))
}

fn finite_score(scores: &[f64], index: usize) -> f64 {
    let score = scores[index];
    if score.is_nan() {
        0.0
    } else {
        score
    }
}

/// Best greedy top-up of a tranche from the promotion pool
///
/// Tries every pool cell as the starting pick; each greedy pass adds the
/// lowest-index remaining cell whose area still fits under the quota and
/// drops that cell's neighbors from the pool. Returns the highest-value
/// fill found, or an empty one.
fn best_fill(
    pool: &BTreeSet<usize>,
    kept_area: f64,
    quota: f64,
    cells: &[ChopCell],
    scores: &[f64],
    neighbors: &BTreeMap<usize, BTreeSet<usize>>,
) -> (f64, BTreeSet<usize>) {
    let mut best_value = 0.0;
    let mut best: BTreeSet<usize> = BTreeSet::new();
    for &start in pool {
        let mut remaining = pool.clone();
        let mut chosen = BTreeSet::new();
        let mut area = kept_area;
        let mut index = start;
        while !remaining.is_empty() {
            area += cells[index].area;
            if area > quota {
                break;
            }
            remaining.remove(&index);
            chosen.insert(index);
            for neighbor in &neighbors[&index] {
                remaining.remove(neighbor);
            }
            match remaining.iter().next() {
                Some(&next) => index = next,
                None => break,
            }
        }
        if chosen.is_empty() {
            continue;
        }
        let value: f64 = chosen.iter().map(|&i| finite_score(scores, i)).sum();
        if best.is_empty() || value > best_value {
            best_value = value;
            best = chosen;
        }
    }
    (best_value, best)
}
