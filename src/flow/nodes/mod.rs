//! Built-in actor implementations.

pub mod collector;
pub mod passthrough;
pub mod script;
pub mod source;
pub mod variable;

pub use collector::{CollectorActor, CollectorHandle};
pub use passthrough::PassthroughActor;
pub use script::ScriptActor;
pub use source::SourceActor;
pub use variable::SetVariableActor;
