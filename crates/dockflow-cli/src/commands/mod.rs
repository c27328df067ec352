pub mod dock;
pub mod status;
