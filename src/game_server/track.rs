//! Track - Segment ring and recycling
//!
//! A fixed number of equal-length segments is laid out behind the origin.
//! As the player advances, segments that fall too far behind are moved just
//! past the front-most one, so the track never runs out and never gaps.

use serde::{Deserialize, Serialize};

/// A single platform segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackSegment {
    /// Identity index, 0..N
    pub index: usize,
    /// Center of the segment along the forward axis
    pub z: f32,
}

/// Owns the segment ring for one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackRecycler {
    segments: Vec<TrackSegment>,
    segment_length: f32,
    segment_width: f32,
}

impl TrackRecycler {
    /// Create a recycler with the initial layout
    pub fn new(segment_count: usize, segment_length: f32, segment_width: f32) -> Self {
        Self {
            segments: Self::initialize(segment_count, segment_length),
            segment_length,
            segment_width,
        }
    }

    /// Lay out `segment_count` segments at `z = -i * segment_length`
    pub fn initialize(segment_count: usize, segment_length: f32) -> Vec<TrackSegment> {
        (0..segment_count)
            .map(|index| TrackSegment {
                index,
                z: -(index as f32) * segment_length,
            })
            .collect()
    }

    /// Restore the initial layout
    pub fn reset(&mut self) {
        self.segments = Self::initialize(self.segments.len(), self.segment_length);
    }

    /// Move every segment that is more than one length behind the player to
    /// the front of the track. Returns how many segments moved.
    ///
    /// Segments are visited in index order. A relocated segment becomes the
    /// new front immediately, so later relocations in the same pass
    /// stack behind it.
    pub fn recycle(&mut self, player_z: f32) -> usize {
        let Some(mut min_z) = self.min_z() else {
            return 0;
        };

        let mut moved = 0;
        for segment in &mut self.segments {
            let distance_behind = segment.z - player_z;
            if distance_behind > self.segment_length {
                segment.z = min_z - self.segment_length;
                min_z = segment.z;
                moved += 1;
            }
        }

        if moved > 0 {
            log::debug!("Recycled {} segment(s), front now at z={}", moved, min_z);
        }
        moved
    }

    /// Whether a point on the ground plane is over the track.
    ///
    /// Anything ahead of the front edge counts as track: recycling runs after
    /// the move, so a long frame may land past segments that are about to be
    /// laid there. Only the rear edge and the sides drop the player.
    pub fn supports(&self, x: f32, z: f32) -> bool {
        let Some(front) = self.min_z() else {
            return false;
        };
        let half_length = self.segment_length / 2.0;
        x.abs() <= self.segment_width / 2.0
            && (z < front
                || self
                    .segments
                    .iter()
                    .any(|segment| (z - segment.z).abs() <= half_length))
    }

    /// Front-most segment center (most negative z)
    pub fn min_z(&self) -> Option<f32> {
        self.segments.iter().map(|s| s.z).reduce(f32::min)
    }

    /// Rear-most segment center
    pub fn max_z(&self) -> Option<f32> {
        self.segments.iter().map(|s| s.z).reduce(f32::max)
    }

    pub fn segments(&self) -> &[TrackSegment] {
        &self.segments
    }

    pub fn segment_length(&self) -> f32 {
        self.segment_length
    }

    pub fn segment_width(&self) -> f32 {
        self.segment_width
    }
}
