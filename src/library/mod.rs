pub mod registry;

pub use registry::{
    BatchRenameReport, FolderEntry, FolderRegistry, FolderStatus, RegistryError, RenameOutcome,
};
