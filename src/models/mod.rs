pub mod ad_window;
pub mod device;
pub mod program;

pub use ad_window::{AdWindow, MergedWindowSet, ESTIMATED_WINDOW_SECS};
pub use device::{PlayerStatus, VolumeState};
pub use program::ProgramInfo;
