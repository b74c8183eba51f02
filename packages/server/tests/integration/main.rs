mod common;
mod media;
mod navigation;
