pub mod assemble;
pub mod mapper;
pub mod report;
pub mod warp;
