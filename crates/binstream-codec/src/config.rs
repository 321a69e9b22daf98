/// Controls codec registry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// When true, declared records without a registered codec get a derived
    /// record codec. Can be toggled later on the registry.
    pub generic_records: bool,
    /// Maximum number of declarations accepted from one declaration file.
    pub max_declarations: usize,
    /// Maximum bytes allowed per declaration file.
    pub max_declaration_file_size: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            generic_records: false,
            max_declarations: 256,
            max_declaration_file_size: 256 * 1024,
        }
    }
}
