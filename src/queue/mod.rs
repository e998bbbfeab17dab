pub mod clip_queue;

pub use clip_queue::ClipQueue;
