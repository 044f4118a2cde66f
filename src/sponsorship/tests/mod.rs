mod common;

mod booth;
mod history;
