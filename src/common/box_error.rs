//! boxed error type used by all fallible calls in the engine.
//!
//! Send + Sync so results can cross the thread boundary between the audio
//! callback and whatever owns the engine.
pub type BoxError = std::boxed::Box<
    dyn std::error::Error // must implement Error to satisfy ?
        + std::marker::Send // needed for threads
        + std::marker::Sync, // needed for threads
>;
