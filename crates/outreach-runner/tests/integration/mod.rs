mod accounting;
mod control;
mod processing;
mod resume;
mod start_errors;
