//! External collaborators of the spotting flow.
//!
//! Wraps the plate-recognition HTTP API and the registration lookup site
//! behind the [`PlateRecognizer`] and [`AttributeLookup`] traits, and
//! wires both into the record store via [`SpotPipeline`].

pub mod error;
pub mod pipeline;
pub mod recognizer;
pub mod scraper;

pub use error::LookupError;
pub use pipeline::SpotPipeline;
pub use recognizer::{PlateRecognizer, PlateRecognizerClient};
pub use scraper::{AttributeLookup, CarCheckClient};
