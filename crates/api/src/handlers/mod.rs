pub mod import;
pub mod master_data;
