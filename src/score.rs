//! Modules that turn smoothed frequencies into labeled notes, record them per
//! channel, and score the match between the two channels.
pub mod note_table;
pub mod note_trace;
pub mod scorer;
