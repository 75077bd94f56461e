pub mod sections;
pub mod status;
pub mod take;
