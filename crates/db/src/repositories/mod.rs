//! Struct-per-table repositories. All queries use explicit column
//! lists and `query_as`.

pub mod correction_log_repo;
pub mod import_file_repo;
pub mod import_row_repo;
pub mod mapped_field_repo;
pub mod master_data_repo;
pub mod override_audit_repo;
pub mod stage_status_repo;

pub use correction_log_repo::CorrectionLogRepo;
pub use import_file_repo::ImportFileRepo;
pub use import_row_repo::ImportRowRepo;
pub use mapped_field_repo::MappedFieldRepo;
pub use master_data_repo::MasterDataRepo;
pub use override_audit_repo::OverrideAuditRepo;
pub use stage_status_repo::StageStatusRepo;
