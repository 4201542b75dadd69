pub mod dataset_repo;
pub mod invocation_repo;

pub use dataset_repo::DatasetRepo;
pub use invocation_repo::InvocationRepo;
