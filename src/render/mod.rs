pub mod overlay;
pub mod plot;
pub mod skeleton;

pub use overlay::{OverlayRenderer, OverlayStyle};
pub use plot::{render_angle_plot, save_angle_plot};
pub use skeleton::SKELETON_CONNECTIONS;
