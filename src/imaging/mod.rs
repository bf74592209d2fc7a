mod filters;
pub mod handlers;
mod pipeline;
mod upload;
mod validation;

pub use filters::{adjust_contrast_brightness, auto_adjust_levels, median_denoise, sharpen};
pub use pipeline::{
    enhance, optimize_for_ocr, scaled_dimensions, EnhanceOptions, OptimizeOptions,
    OptimizedImage, OUTPUT_MIME,
};
pub use upload::{read_image_upload, ImageUpload, IMAGE_FIELD};
pub use validation::{validate_image_file, ACCEPTED_TYPES};
