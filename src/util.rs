pub mod frame;
pub mod kmeans;
pub mod pca;
pub mod pylist;
pub mod scale;
pub mod stats;
