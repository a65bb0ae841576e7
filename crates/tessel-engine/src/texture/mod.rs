//! Images and GPU textures.

mod image;
mod owned;

pub use self::image::Image;
pub use self::owned::{region_uv, Texture};
