// Parser module: turns raw identification responses into validated detections.

pub mod detection_parser;

pub use detection_parser::parse_detection;
