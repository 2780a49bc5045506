pub mod compose;
mod config;
pub mod constants;
mod io;
pub mod job;
pub mod label;
mod order;
pub mod render;
mod types;

pub use compose::{ComposeStats, ComposedDocument, compose_despatch_pages};
pub use config::*;
pub use io::{load_pdf_bytes, save_pdf_bytes, write_pdf};
pub use job::{JobContext, JobKind, JobOutput, Mailer, OrderSource, OutgoingMail, RunSummary, run_packsheets, run_report};
pub use label::{HttpLabelFetcher, LabelFetcher, LabelPage, LabelRecord, LabelSource, resolve_labels};
pub use order::*;
pub use types::*;
