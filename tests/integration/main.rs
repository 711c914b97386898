
mod concurrency;
mod matrix;
mod script_tool;
