pub mod bucket;
pub mod dimension;
pub mod file;
pub mod file_instance;
pub mod settings;

pub use bucket::BucketRepository;
pub use dimension::DimensionRepository;
pub use file::FileRepository;
pub use file_instance::FileInstanceRepository;
pub use settings::SettingsRepository;
