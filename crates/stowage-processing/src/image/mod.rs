pub mod codec;
pub mod resize;

pub use codec::{ImageCodec, ImageCrateCodec};
pub use resize::ContainFit;
