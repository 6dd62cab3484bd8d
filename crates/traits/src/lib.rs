pub mod engine;
pub mod static_engine;

pub use engine::{
    DocumentSource, EngineError, EngineEvent, EventReceiver, EventSender, LoadRequest,
    PrintRequest, RenderEngine, event_channel,
};
pub use static_engine::{CallLog, EngineCall, StaticEngine};
