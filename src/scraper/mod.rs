// Scraper module: network collaborators of the analysis pipeline.

pub mod traits;
pub mod image_fetcher;
pub mod identifier;

pub use identifier::HttpIdentifier;
pub use image_fetcher::HttpImageFetcher;
pub use traits::{Identifier, ImageFetcher};
