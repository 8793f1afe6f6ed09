pub mod grayscale;
pub mod scratch;

pub use grayscale::{to_grayscale_rgb, Desaturate};
pub use scratch::ScratchImage;

use std::any::TypeId;

pub fn is_floating_point<T: 'static>() -> bool {
    TypeId::of::<T>() == TypeId::of::<f32>()
}
