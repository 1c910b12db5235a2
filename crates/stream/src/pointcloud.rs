//! Point cloud snapshot types

use serde::{Deserialize, Serialize};

use crate::error::{StreamError, StreamResult};

/// A validated point cloud captured at one instant.
///
/// `positions` holds consecutive `x, y, z` triples and `colors`, when
/// present, consecutive `r, g, b` triples in the 0-1 range for the same points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCloudSnapshot {
    /// Flattened point coordinates
    pub positions: Vec<f32>,
    /// Flattened per-point colors
    pub colors: Option<Vec<f32>>,
    /// Number of points (`positions.len() / 3`)
    pub point_count: usize,
}

impl PointCloudSnapshot {
    /// Validate buffers and build a snapshot.
    pub fn new(positions: Vec<f32>, colors: Option<Vec<f32>>) -> StreamResult<Self> {
        if positions.len() % 3 != 0 {
            return Err(StreamError::InvalidPositions {
                len: positions.len(),
            });
        }

        // An empty color list means the cloud is uncolored
        let colors = colors.filter(|c| !c.is_empty());

        if let Some(colors) = &colors {
            if colors.len() != positions.len() {
                return Err(StreamError::ColorMismatch {
                    positions: positions.len(),
                    colors: colors.len(),
                });
            }
        }

        let point_count = positions.len() / 3;

        Ok(Self {
            positions,
            colors,
            point_count,
        })
    }

    /// Whether the snapshot carries per-point colors
    pub fn has_colors(&self) -> bool {
        self.colors.is_some()
    }
}

/// Load/stream state reported to dashboards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointCloudStatus {
    /// A snapshot has been loaded
    pub is_loaded: bool,
    /// Streaming flag as last set by start/stop
    pub is_streaming: bool,
    /// Points in the current snapshot, if loaded
    pub point_count: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_only() {
        let pc = PointCloudSnapshot::new(vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0], None).unwrap();

        assert_eq!(pc.point_count, 2);
        assert_eq!(pc.positions.len(), 6);
        assert!(!pc.has_colors());
    }

    #[test]
    fn test_with_colors() {
        let pc = PointCloudSnapshot::new(
            vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
            Some(vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0]),
        )
        .unwrap();

        assert_eq!(pc.point_count, 2);
        assert_eq!(pc.colors.as_ref().map(Vec::len), Some(6));
    }

    #[test]
    fn test_empty_cloud_is_valid() {
        let pc = PointCloudSnapshot::new(vec![], None).unwrap();
        assert_eq!(pc.point_count, 0);
    }

    #[test]
    fn test_point_count_for_any_multiple_of_three() {
        for points in 0..50usize {
            let positions = vec![0.5f32; points * 3];
            let pc = PointCloudSnapshot::new(positions, None).unwrap();
            assert_eq!(pc.point_count, points);
        }
    }

    #[test]
    fn test_rejects_partial_triple() {
        for len in [1usize, 2, 4, 5, 7, 3001] {
            let result = PointCloudSnapshot::new(vec![0.0; len], None);
            assert_eq!(result, Err(StreamError::InvalidPositions { len }));
        }
    }

    #[test]
    fn test_rejects_mismatched_colors() {
        let result = PointCloudSnapshot::new(vec![0.0; 6], Some(vec![1.0; 3]));
        assert_eq!(
            result,
            Err(StreamError::ColorMismatch {
                positions: 6,
                colors: 3
            })
        );
    }

    #[test]
    fn test_empty_colors_mean_uncolored() {
        let pc = PointCloudSnapshot::new(vec![0.0; 3], Some(vec![])).unwrap();

        assert_eq!(pc.point_count, 1);
        assert_eq!(pc.colors, None);
        assert!(!pc.has_colors());
    }

    #[test]
    fn test_json_representation() {
        let pc = PointCloudSnapshot::new(
            vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
            Some(vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0]),
        )
        .unwrap();

        let json = serde_json::to_value(&pc).unwrap();
        assert_eq!(json["point_count"], 2);
        assert_eq!(json["positions"], serde_json::json!([0.0, 0.0, 0.0, 1.0, 1.0, 1.0]));
        assert_eq!(json["colors"], serde_json::json!([1.0, 0.0, 0.0, 0.0, 1.0, 0.0]));

        let bare = PointCloudSnapshot::new(vec![0.0; 3], None).unwrap();
        assert!(serde_json::to_value(&bare).unwrap()["colors"].is_null());
    }
}
