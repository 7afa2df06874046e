pub mod endpointer;
pub mod ingest;
pub mod ledger;
pub mod sequencer;
pub mod session;
pub mod validator;

pub use endpointer::{EndpointerEmitter, EndpointerState};
pub use ingest::IngestQueue;
pub use ledger::{LedgerUpdate, ResultLedger};
pub use sequencer::ResponseSequencer;
pub use session::{PipelineSignal, Session, SessionOutcome, SessionState};
pub use validator::ConfigValidator;
