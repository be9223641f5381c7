mod frame;
mod slot;

pub use frame::{Dimensions, Frame};
pub use slot::FrameSlot;
