//! Core of Icebreaker: turns a LinkedIn profile URL into a personalized
//! outreach draft.
//!
//! - [`normalize`] maps inconsistent scraper output onto a [`LeadRecord`]
//! - [`signals`] ranks the facts worth opening with
//! - [`compose`] builds the prompt and reads the backend's reply
//! - [`pipeline`] wires scraping, normalization and composition per lead
//!
//! [`LeadRecord`]: icebreaker_types::LeadRecord

pub mod compose;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod signals;

pub use compose::{parse_draft, strip_code_fences, ComposeMode, Composer};
pub use error::{GenerationError, LeadError};
pub use normalize::{normalize, Normalizer};
pub use pipeline::{BatchRequest, CollaboratorFactory, LeadPipeline, LeadRequest, LiveCollaborators};
pub use signals::{detect_signals, Signal, SignalCategory};
