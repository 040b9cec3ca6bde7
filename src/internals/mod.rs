mod emitter;

pub use emitter::Emitter;
