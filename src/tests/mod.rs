mod config;
mod message;
mod timer;
