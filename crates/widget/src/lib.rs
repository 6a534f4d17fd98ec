pub mod attachment;
pub mod backend;
pub mod controller;
pub mod drag;
pub mod render;

pub use backend::{AnswerBackend, AskRequest, HttpBackend};
pub use controller::{UiEvent, ViewBlock, WidgetController, WidgetUpdate, WIDGET_ROOT_ID};
pub use drag::{DragSurface, Point, Size};
