pub mod feedback;
pub mod fit_scoring;
pub mod handlers;
pub mod prompts;
