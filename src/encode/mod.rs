pub mod ffmpeg;
pub mod format;
pub mod output;
pub mod recorder;
