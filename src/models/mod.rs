pub mod conversation;
pub mod daily_metric;
pub mod enums;
pub mod health_event;
pub mod metric;
pub mod upload;

pub use conversation::*;
pub use daily_metric::*;
pub use enums::*;
pub use health_event::*;
pub use metric::*;
pub use upload::*;
