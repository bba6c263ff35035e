pub mod coordinator;
pub mod engine;
pub mod registry;
pub mod sync;
pub mod turn;
pub mod utils;

pub use coordinator::{MoveCoordinator, ProposeOutcome};
pub use engine::{ChessEngine, RuleEngine};
pub use registry::{Admission, JoinKind, SessionEntry, SessionRegistry};
pub use turn::{Role, TurnArbiter};
