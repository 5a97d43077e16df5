//! ST graph: projected obstacle occupancy in (arc length, time) space.
//!
//! Rebuilt every tick. An obstacle enters the graph when its predicted
//! footprint touches the lane band of the reference line inside the
//! lookahead window; its block is the bounding (s, t) rectangle of those
//! touches. The collision checker uses graph membership to prune obstacles,
//! the end-condition sampler uses the blocks to seed follow/overtake goals.

use std::collections::HashMap;

use crate::reference::ReferenceLine;
use crate::world::ObstacleSnapshot;

/// Bounding (s, t) rectangle of one obstacle's projected motion.
#[derive(Clone, Copy, Debug)]
pub struct StBlock {
    pub s_low: f64,
    pub s_high: f64,
    pub t_low: f64,
    pub t_high: f64,
    /// Longitudinal speed of the obstacle along the reference
    pub speed: f64,
    /// Obstacle bounding box length, for gap bookkeeping
    pub length: f64,
}

/// Per-tick obstacle occupancy over the lookahead horizon.
#[derive(Debug, Default)]
pub struct StGraph {
    blocks: HashMap<i32, StBlock>,
}

impl StGraph {
    /// Project every valid obstacle over `[0, max_lookahead_time]` at
    /// `delta_t` steps.
    pub fn build(
        obstacles: &ObstacleSnapshot,
        ref_line: &ReferenceLine,
        max_lookahead_time: f64,
        delta_t: f64,
    ) -> Self {
        let mut blocks = HashMap::new();
        for obstacle in obstacles.iter() {
            let mut block: Option<StBlock> = None;
            let mut t = 0.0;
            while t < max_lookahead_time {
                let point = obstacle.point_at(t);
                let sl = ref_line.xy_to_sl(point.path_point.x, point.path_point.y);
                let (left, right) = ref_line.lane_width(sl.s);
                let half_width = 0.5 * obstacle.width();
                let in_band = sl.l < left + half_width && sl.l > -(right + half_width);
                if in_band && sl.s > 0.0 && sl.s < ref_line.length() {
                    let half_length = 0.5 * obstacle.length();
                    let entry = block.get_or_insert(StBlock {
                        s_low: sl.s - half_length,
                        s_high: sl.s + half_length,
                        t_low: t,
                        t_high: t,
                        speed: point.v,
                        length: obstacle.length(),
                    });
                    entry.s_low = entry.s_low.min(sl.s - half_length);
                    entry.s_high = entry.s_high.max(sl.s + half_length);
                    entry.t_high = t;
                }
                t += delta_t;
            }
            if let Some(block) = block {
                blocks.insert(obstacle.id(), block);
            }
        }
        Self { blocks }
    }

    pub fn is_obstacle_in_graph(&self, id: i32) -> bool {
        self.blocks.contains_key(&id)
    }

    pub fn block(&self, id: i32) -> Option<&StBlock> {
        self.blocks.get(&id)
    }

    pub fn blocks(&self) -> impl Iterator<Item = (&i32, &StBlock)> {
        self.blocks.iter()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
