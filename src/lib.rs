pub mod compliance;
pub mod error;
pub mod ids;
pub mod model;
pub mod parser;
pub mod records;
pub mod settings;
pub mod text;

pub use compliance::{
    check_record, is_valid_workflow, normalize, normalize_record, normalize_titled, Check, NormalizeOptions,
};
pub use error::{Error, Result};
pub use ids::{Clock, FixedClock, IdSource, RandomIds, SequentialIds, SystemClock};
pub use model::{Demo, DemoKind, ScrapeInput, ScrapeResult, WorkflowDetails, WorkflowPayload};
pub use parser::{clean_record, extract_demo, locate_demo};
pub use settings::Settings;
