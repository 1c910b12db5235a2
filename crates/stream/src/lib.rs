//! Point cloud distribution
//!
//! Validates incoming point clouds, keeps the most recent one as the
//! current snapshot and fans each new snapshot out to live subscribers
//! through bounded per-subscriber queues.

#![warn(missing_docs)]

pub mod error;
pub mod pointcloud;
pub mod service;

pub use error::{StreamError, StreamResult};
pub use pointcloud::{PointCloudSnapshot, PointCloudStatus};
pub use service::{
    DistributionMetrics, PointCloudService, SubscriberId, Subscription,
    DEFAULT_SUBSCRIBER_CAPACITY,
};
