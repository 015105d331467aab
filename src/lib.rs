// src/lib.rs - Library interface for the pathology annotator

pub mod annotation;
pub mod blur;
pub mod color_space;
pub mod config;
pub mod debug_panel;
pub mod errors;
pub mod image_io;
pub mod output;
pub mod pipeline;
pub mod ranking;
pub mod segmentation;

// Re-export commonly used types and functions
pub use errors::{AnnotatorError, Result};
pub use config::{AnnotationConfig, Config, HsvRange, RankingConfig, SegmentationConfig};
pub use pipeline::{analyze_image, process_image, process_input, ImageAnalysis};
pub use image_io::{InputImage, get_image_files_in_dir, load_image, save_image};
pub use output::{ImageReport, write_region_csv, write_summary_csv};

// Re-export the detection stages
pub use color_space::{HsvImage, to_gray, to_hsv};
pub use blur::IntensityField;
pub use segmentation::{Segmentation, segment};
pub use ranking::{RankedRegion, rank};

// Re-export annotation primitives
pub use annotation::{
    annotate,
    arrow_head_corners,
    arrow_start,
    draw_arrow,
    plan_markers,
    ArrowHead,
    Marker,
};
