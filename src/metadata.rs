use serde::{Deserialize, Serialize};

pub const METADATA_FILE_NAME: &str = "metadata.json";
pub const METADATA_SCHEMA_VERSION: u32 = 1;
pub const DEFAULT_AUTHOR: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModKind {
    Local,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Characters,
    Weapons,
    Maps,
    Sounds,
    Scripts,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Characters,
        Category::Weapons,
        Category::Maps,
        Category::Sounds,
        Category::Scripts,
        Category::Other,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "characters" => Some(Category::Characters),
            "weapons" => Some(Category::Weapons),
            "maps" => Some(Category::Maps),
            "sounds" => Some(Category::Sounds),
            "scripts" => Some(Category::Scripts),
            "other" => Some(Category::Other),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Characters => "characters",
            Category::Weapons => "weapons",
            Category::Maps => "maps",
            Category::Sounds => "sounds",
            Category::Scripts => "scripts",
            Category::Other => "other",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PreviewImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct ModDetails {
    pub name: String,
    pub author: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub preview: Option<PreviewImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModMetadata {
    pub id: String,
    pub kind: ModKind,
    pub name: String,
    pub author: String,
    pub link: Option<String>,
    pub description: Option<String>,
    pub category: Category,
    pub created_at: String,
    pub preview: String,
    #[serde(rename = "_schema")]
    pub schema: u32,
}
