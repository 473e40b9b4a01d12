pub mod descriptor;
pub mod executor;
