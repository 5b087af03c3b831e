pub mod descriptor;
pub mod manifest;
pub mod module;

pub use descriptor::{
    ActionSpec, ExportNode, ExportScan, ExportedLeaf, Exposed, LeafDescriptor, ModuleMeta,
    Parameter, MODULE_GROUP_KEY, scan_exports,
};
pub use manifest::{EntryPoint, ModuleManifest, MANIFEST_FILES};
pub use module::{
    CacheEntry, GitSpec, ModuleSpec, ModuleType, ResolvedModule, DEFAULT_GIT_REF, GIT_PREFIX,
    LOCAL_BUCKET, LOCAL_PREFIX, derive_path,
};
