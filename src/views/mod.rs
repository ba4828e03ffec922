//! Derived Views
//!
//! Rankings, trailing-window filters, and box-plot buckets computed from
//! store snapshots. Every view is a fresh value; snapshots are only read.
//!
//! - **Rank**: `top_by_field`, `top_by_tweet_volume`, `filter_trailing_window`
//! - **Quartile**: index-based five-number summaries with outliers
//! - **Dashboard**: the full set of views shown together
//! - **Watcher**: keeps the dashboard views current

mod dashboard;
mod quartile;
mod rank;
mod watcher;

pub use dashboard::{DashboardViews, ViewSettings};
pub use quartile::{box_plot, sentiment_distribution, BoxPlot, TokenDistribution};
pub use rank::{filter_trailing_window, top_by, top_by_field, top_by_tweet_volume, TokenVolume};
pub use watcher::ViewWatcher;
