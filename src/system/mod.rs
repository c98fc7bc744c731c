pub mod bus;
pub mod event_queue;
