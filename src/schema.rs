pub mod features;
pub mod records;
