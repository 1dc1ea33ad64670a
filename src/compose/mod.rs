pub mod compositor;
pub mod letterbox;
