mod pointer;

pub use pointer::{
    PointerEvent, PointerEventBus, PointerEventKind, PointerSubscription, PointerTarget,
};
