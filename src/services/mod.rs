pub mod artifact_store;
pub mod challenge_client;
pub mod cipher_solver;
pub mod pdf_decoder;

pub use artifact_store::ArtifactStore;
pub use challenge_client::{ChallengeClient, ChallengeFetch};
pub use pdf_decoder::DecodeError;
