//! Hierarchical greedy clustering of stations over per-zoom spatial indexes.
//!
//! The index is built once per roster snapshot: level `max_zoom + 1` holds one
//! leaf per station in projected world coordinates, and each lower zoom is
//! produced by greedily merging everything within the zoom's merge radius into
//! count-weighted aggregates. Every level carries an R-tree, so viewport and
//! neighbour lookups stay cheap at any zoom. The index is immutable after
//! construction; a roster change means building a fresh one.

use crate::cluster::error::ClusterError;
use crate::cluster::projection::{lat_y, lng_x, x_lng, y_lat};
use crate::types::geo::Bbox;
use crate::types::station::Station;
use log::info;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use serde::Serialize;
use std::sync::Arc;

/// Tile extent the pixel radius is measured against.
const EXTENT: f64 = 512.0;

/// Tuning knobs for [`ClusterIndex`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterConfig {
    /// Merge radius in pixels at `EXTENT`-sized tiles.
    pub radius: f64,
    /// Lowest zoom level a cluster hierarchy is kept for.
    pub min_zoom: u8,
    /// Highest zoom level that still clusters; one level above it every
    /// station stands alone. At most 30, because cluster ids reserve five
    /// bits for the level.
    pub max_zoom: u8,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            radius: 60.0,
            min_zoom: 0,
            max_zoom: 16,
        }
    }
}

/// One node of a viewport query result: either a lone station or an aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ClusterNode {
    Single(Station),
    Cluster(ClusterInfo),
}

/// An aggregate of two or more stations.
///
/// The centroid is the count-weighted mean of the member positions, mapped
/// back to degrees. `id` is stable for the lifetime of the index that produced
/// it and can be passed to [`ClusterIndex::expansion_zoom`]; it carries no
/// meaning across roster refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClusterInfo {
    pub id: u64,
    pub latitude: f64,
    pub longitude: f64,
    pub point_count: u32,
}

/// A node in one zoom level of the hierarchy. Leaves keep the station slot as
/// their id; aggregates get an encoded id (seed slot, formation level) offset
/// past the leaf id range.
#[derive(Debug, Clone, Copy)]
struct LevelNode {
    x: f64,
    y: f64,
    id: u64,
    count: u32,
    /// Id of the aggregate one zoom below that absorbed this node, set while
    /// that zoom is built. Used to recover a cluster's children.
    parent: Option<u64>,
}

/// Position-plus-slot entry stored in the per-level R-trees. Kept separate
/// from [`LevelNode`] so parent marks can be written without touching a tree.
#[derive(Debug, Clone, Copy)]
struct TreeEntry {
    pos: [f64; 2],
    slot: usize,
}

impl RTreeObject for TreeEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.pos)
    }
}

impl PointDistance for TreeEntry {
    /// Squared Euclidean distance in projected world coordinates.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.pos[0] - point[0];
        let dy = self.pos[1] - point[1];
        dx * dx + dy * dy
    }
}

struct Level {
    nodes: Vec<LevelNode>,
    tree: RTree<TreeEntry>,
}

/// Immutable per-zoom cluster hierarchy over one roster snapshot.
///
/// Queries never mutate, so an index can be shared behind an `Arc` and hit
/// from any number of tasks in parallel.
pub struct ClusterIndex {
    stations: Arc<Vec<Station>>,
    config: ClusterConfig,
    /// Levels ordered from `min_zoom` up to `max_zoom + 1` (the leaf level).
    levels: Vec<Level>,
}

impl ClusterIndex {
    /// Builds the full hierarchy for `stations`.
    ///
    /// Construction walks zooms from `max_zoom` down to `min_zoom`, each pass
    /// merging, in input order, every not-yet-absorbed node with its
    /// neighbours within the zoom's merge radius. Identical input always
    /// yields an identical hierarchy.
    pub fn new(stations: Arc<Vec<Station>>, config: ClusterConfig) -> Self {
        // Five bits of the id encoding hold the level, and zooms are kept
        // meaningful by never letting min exceed max.
        let max_zoom = config.max_zoom.min(30);
        let config = ClusterConfig {
            radius: config.radius,
            min_zoom: config.min_zoom.min(max_zoom),
            max_zoom,
        };
        let num_leaves = stations.len() as u64;

        let leaves: Vec<LevelNode> = stations
            .iter()
            .enumerate()
            .map(|(slot, station)| LevelNode {
                x: lng_x(station.longitude),
                y: lat_y(station.latitude),
                id: slot as u64,
                count: 1,
                parent: None,
            })
            .collect();

        // Built from the leaf level downward, then reversed so that index 0
        // is min_zoom and the last entry is the leaf level.
        let mut levels = Vec::with_capacity((max_zoom + 2 - config.min_zoom) as usize);
        let mut nodes = leaves;
        let mut tree = Self::build_tree(&nodes);
        for zoom in (config.min_zoom..=max_zoom).rev() {
            let merged = Self::cluster_pass(&mut nodes, &tree, zoom, config.radius, num_leaves);
            let merged_tree = Self::build_tree(&merged);
            levels.push(Level { nodes, tree });
            nodes = merged;
            tree = merged_tree;
        }
        levels.push(Level { nodes, tree });
        levels.reverse();

        info!(
            "Built cluster index over {} stations for zooms {}..={}",
            stations.len(),
            config.min_zoom,
            max_zoom + 1
        );
        Self {
            stations,
            config,
            levels,
        }
    }

    /// Returns the nodes visible in `bbox` at `zoom`.
    ///
    /// The zoom is clamped to `[min_zoom, max_zoom + 1]`. Longitudes are
    /// normalized: a box spanning 360 degrees or more covers the whole world,
    /// and a box crossing the antimeridian is split into an eastern and a
    /// western query whose results are concatenated. Latitudes clamp to
    /// `[-90, 90]`. An empty roster or a disjoint box yields an empty list.
    pub fn clusters(&self, bbox: Bbox, zoom: u8) -> Vec<ClusterNode> {
        let min_lat = bbox.south.clamp(-90.0, 90.0);
        let max_lat = bbox.north.clamp(-90.0, 90.0);

        let mut min_lng = wrap_lng(bbox.west);
        let mut max_lng = if bbox.east == 180.0 {
            180.0
        } else {
            wrap_lng(bbox.east)
        };

        if bbox.east - bbox.west >= 360.0 {
            min_lng = -180.0;
            max_lng = 180.0;
        } else if min_lng > max_lng {
            let mut nodes = self.range_nodes(min_lng, min_lat, 180.0, max_lat, zoom);
            nodes.extend(self.range_nodes(-180.0, min_lat, max_lng, max_lat, zoom));
            return nodes;
        }
        self.range_nodes(min_lng, min_lat, max_lng, max_lat, zoom)
    }

    /// Returns the zoom at which the given cluster first splits apart, for
    /// map "click to expand" behavior. The result never exceeds `max_zoom`,
    /// so clusters of coincident stations still resolve to a reachable zoom.
    ///
    /// Leaf ids and ids from another index fail with
    /// [`ClusterError::UnknownCluster`].
    pub fn expansion_zoom(&self, cluster_id: u64) -> Result<u8, ClusterError> {
        let (origin_zoom, _) = self.decode_cluster_id(cluster_id)?;
        let mut id = cluster_id;
        let mut zoom = origin_zoom.saturating_sub(1);
        while zoom <= self.config.max_zoom {
            let (child_level, slots) = self.child_slots(id)?;
            zoom = child_level;
            if slots.len() != 1 {
                break;
            }
            let child = self.levels[(child_level - self.config.min_zoom) as usize].nodes[slots[0]];
            if child.count <= 1 {
                break;
            }
            id = child.id;
        }
        Ok(zoom.min(self.config.max_zoom))
    }

    fn range_nodes(
        &self,
        min_lng: f64,
        min_lat: f64,
        max_lng: f64,
        max_lat: f64,
        zoom: u8,
    ) -> Vec<ClusterNode> {
        let level = self.level(zoom);
        let envelope = AABB::from_corners(
            [lng_x(min_lng), lat_y(max_lat)],
            [lng_x(max_lng), lat_y(min_lat)],
        );
        let mut slots: Vec<usize> = level
            .tree
            .locate_in_envelope(&envelope)
            .map(|entry| entry.slot)
            .collect();
        // Slot order makes results deterministic regardless of tree layout.
        slots.sort_unstable();
        slots
            .into_iter()
            .map(|slot| self.node_at(level, slot))
            .collect()
    }

    fn node_at(&self, level: &Level, slot: usize) -> ClusterNode {
        let node = &level.nodes[slot];
        if node.count > 1 {
            ClusterNode::Cluster(ClusterInfo {
                id: node.id,
                latitude: y_lat(node.y),
                longitude: x_lng(node.x),
                point_count: node.count,
            })
        } else {
            ClusterNode::Single(self.stations[node.id as usize].clone())
        }
    }

    /// The level a query at `zoom` is served from.
    fn level(&self, zoom: u8) -> &Level {
        let clamped = zoom.clamp(self.config.min_zoom, self.config.max_zoom + 1);
        &self.levels[(clamped - self.config.min_zoom) as usize]
    }

    /// Splits a cluster id into (formation level of its children, seed slot).
    fn decode_cluster_id(&self, cluster_id: u64) -> Result<(u8, usize), ClusterError> {
        let num_leaves = self.stations.len() as u64;
        if cluster_id < num_leaves {
            return Err(ClusterError::UnknownCluster(cluster_id));
        }
        let encoded = cluster_id - num_leaves;
        Ok(((encoded % 32) as u8, (encoded >> 5) as usize))
    }

    /// Finds the slots, on the cluster's formation level, of the nodes that
    /// merged into `cluster_id`.
    fn child_slots(&self, cluster_id: u64) -> Result<(u8, Vec<usize>), ClusterError> {
        let (origin_zoom, origin_slot) = self.decode_cluster_id(cluster_id)?;
        let level = origin_zoom
            .checked_sub(self.config.min_zoom)
            .and_then(|offset| self.levels.get(offset as usize))
            .ok_or(ClusterError::UnknownCluster(cluster_id))?;
        let seed = level
            .nodes
            .get(origin_slot)
            .ok_or(ClusterError::UnknownCluster(cluster_id))?;

        // Members were absorbed within the merge radius of the zoom the
        // cluster formed at, one below the children's level.
        let r = merge_radius(self.config.radius, origin_zoom.saturating_sub(1));
        let mut slots: Vec<usize> = level
            .tree
            .locate_within_distance([seed.x, seed.y], r * r)
            .map(|entry| entry.slot)
            .filter(|&slot| level.nodes[slot].parent == Some(cluster_id))
            .collect();
        if slots.is_empty() {
            return Err(ClusterError::UnknownCluster(cluster_id));
        }
        slots.sort_unstable();
        Ok((origin_zoom, slots))
    }

    /// One merge pass: consumes the nodes of level `zoom + 1` (writing parent
    /// marks into them) and produces the nodes of level `zoom`.
    fn cluster_pass(
        children: &mut [LevelNode],
        tree: &RTree<TreeEntry>,
        zoom: u8,
        radius: f64,
        num_leaves: u64,
    ) -> Vec<LevelNode> {
        let r = merge_radius(radius, zoom);
        let r2 = r * r;
        let mut processed = vec![false; children.len()];
        let mut merged = Vec::with_capacity(children.len());

        for seed in 0..children.len() {
            if processed[seed] {
                continue;
            }
            processed[seed] = true;

            let LevelNode {
                x, y, count: origin_count, ..
            } = children[seed];

            let mut member_slots: Vec<usize> = tree
                .locate_within_distance([x, y], r2)
                .map(|entry| entry.slot)
                .filter(|&slot| !processed[slot])
                .collect();
            // Absorb in slot order so centroid arithmetic is reproducible.
            member_slots.sort_unstable();

            if member_slots.is_empty() {
                // Nothing new in range; the node carries over unchanged.
                merged.push(children[seed]);
                continue;
            }

            let id = encode_cluster_id(seed, zoom, num_leaves);
            let mut total = origin_count;
            let mut wx = x * f64::from(origin_count);
            let mut wy = y * f64::from(origin_count);
            for &slot in &member_slots {
                processed[slot] = true;
                let member = children[slot];
                total += member.count;
                wx += member.x * f64::from(member.count);
                wy += member.y * f64::from(member.count);
            }

            children[seed].parent = Some(id);
            for &slot in &member_slots {
                children[slot].parent = Some(id);
            }
            merged.push(LevelNode {
                x: wx / f64::from(total),
                y: wy / f64::from(total),
                id,
                count: total,
                parent: None,
            });
        }
        merged
    }

    fn build_tree(nodes: &[LevelNode]) -> RTree<TreeEntry> {
        RTree::bulk_load(
            nodes
                .iter()
                .enumerate()
                .map(|(slot, node)| TreeEntry {
                    pos: [node.x, node.y],
                    slot,
                })
                .collect(),
        )
    }
}

/// Merge radius in world units at the given zoom.
fn merge_radius(radius: f64, zoom: u8) -> f64 {
    radius / (EXTENT * f64::powi(2.0, i32::from(zoom)))
}

fn encode_cluster_id(seed_slot: usize, zoom: u8, num_leaves: u64) -> u64 {
    ((seed_slot as u64) << 5) + u64::from(zoom) + 1 + num_leaves
}

fn wrap_lng(lng: f64) -> f64 {
    ((lng + 180.0) % 360.0 + 360.0) % 360.0 - 180.0
}
