pub mod client;
pub mod worker;

pub use client::{TranslationClient, TranslationOptions, Translator};
pub use worker::{
    artifact_name, spawn_translation_job, JobOutcome, TranslationJob, TranslationWorker,
};
