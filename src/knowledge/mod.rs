//! College knowledge for prompt grounding
//!
//! - **faq**: the embedded FAQ corpus
//! - **selection**: score records against a query and format the winners

mod faq;
mod selection;

pub use faq::{FaqRecord, corpus};
pub use selection::{MAX_GROUNDING_RECORDS, format_grounding, score_record, select_relevant};
