//! Path densification: turns a coarse route into the fine-grained sequence of
//! points a taxi steps through, one frame at a time.
//!
//! [`interpolate`] is a pure function. [`InterpolationCache`] memoizes it keyed
//! by the exact segment contents and point count.

use std::num::NonZeroUsize;
use std::sync::Arc;

use bevy_ecs::prelude::Resource;
use lru::LruCache;

use crate::geo::{Coordinate, PathSegment};

/// Sub-points per segment used when nothing else is configured.
pub const DEFAULT_POINTS_PER_SEGMENT: usize = 100;

/// Upper bound on sub-points per segment.
pub const MAX_POINTS_PER_SEGMENT: usize = 10_000;

const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Linearly interpolate every segment into `points_per_segment + 1` samples
/// (both endpoints included) and concatenate them in order.
///
/// The point count is clamped to `1..=MAX_POINTS_PER_SEGMENT`, so every
/// segment still yields its endpoints.
pub fn interpolate(segments: &[PathSegment], points_per_segment: usize) -> Vec<Coordinate> {
    let n = clamp_points(points_per_segment);
    let mut points = Vec::with_capacity(segments.len().saturating_mul(n + 1));
    for segment in segments {
        let lat_step = (segment.end.lat - segment.start.lat) / n as f64;
        let lng_step = (segment.end.lng - segment.start.lng) / n as f64;
        for i in 0..n {
            points.push(Coordinate::new(
                segment.start.lat + lat_step * i as f64,
                segment.start.lng + lng_step * i as f64,
            ));
        }
        // Exact endpoint, free of accumulated rounding.
        points.push(segment.end);
    }
    points
}

pub(crate) fn clamp_points(points_per_segment: usize) -> usize {
    points_per_segment.clamp(1, MAX_POINTS_PER_SEGMENT)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PathKey {
    segments: Vec<[u64; 4]>,
    points_per_segment: usize,
}

impl PathKey {
    fn new(segments: &[PathSegment], points_per_segment: usize) -> Self {
        Self {
            segments: segments
                .iter()
                .map(|s| {
                    [
                        s.start.lat.to_bits(),
                        s.start.lng.to_bits(),
                        s.end.lat.to_bits(),
                        s.end.lng.to_bits(),
                    ]
                })
                .collect(),
            points_per_segment: clamp_points(points_per_segment),
        }
    }
}

/// LRU memo of densified paths.
#[derive(Resource)]
pub struct InterpolationCache {
    cache: LruCache<PathKey, Arc<Vec<Coordinate>>>,
}

impl InterpolationCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
        }
    }

    /// Densified path for `segments`, computed once per distinct input.
    pub fn densify(
        &mut self,
        segments: &[PathSegment],
        points_per_segment: usize,
    ) -> Arc<Vec<Coordinate>> {
        let key = PathKey::new(segments, points_per_segment);
        if let Some(hit) = self.cache.get(&key) {
            return Arc::clone(hit);
        }
        let path = Arc::new(interpolate(segments, points_per_segment));
        self.cache.put(key, Arc::clone(&path));
        path
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl Default for InterpolationCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
