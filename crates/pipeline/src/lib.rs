pub mod convert;
pub mod dispatcher;
pub mod error;
pub mod progress;
pub mod store;

pub use convert::{
    ConversionMethod, Converter, ConverterSet, DirectMethod, DocumentConverter, FormattedMethod,
    MethodChain, Outcome, SpreadsheetConverter, StatementConverter,
};
pub use dispatcher::{Dispatcher, Job, DEFAULT_MAX_CONCURRENT};
pub use error::ConvertError;
pub use progress::{Pacing, ProgressReporter, ProgressSpan};
pub use store::TaskStore;
