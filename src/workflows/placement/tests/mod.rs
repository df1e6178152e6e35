mod application;
mod common;
