use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of datasets shown per page on the dataset list.
pub const DATASETS_PER_PAGE: i64 = 25;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetEntry {
    pub id: i32,
    pub owner_id: i32,
    pub owner_name: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DatasetEntry {
    /// Canonical detail-page location for this dataset.
    pub fn absolute_url(&self) -> String {
        format!("/{}/{}", self.owner_name, self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataFileEntry {
    pub id: i32,
    pub dataset_id: i32,
    pub filename: String,
    pub signature: String,
    pub storage_path: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StarEntry {
    pub id: i32,
    pub user_id: i32,
    pub dataset_id: i32,
    pub created_at: DateTime<Utc>,
}

/// Fields accepted when creating or updating a dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDatasetFields {
    pub owner_id: i32,
    pub name: String,
    pub description: String,
}

/// One page of the dataset list plus its aggregate context.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetListPage {
    pub datasets: Vec<DatasetEntry>,
    pub page: i64,
    pub num_datasets: i64,
    /// Creation time of the most recently created dataset. Never
    /// computed when `num_datasets` is zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_dataset: Option<DateTime<Utc>>,
}

/// The detail sub-view a dataset page renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelName {
    Files,
    Schema,
    Explore,
    Settings,
}

impl PanelName {
    pub fn as_str(&self) -> &'static str {
        match self {
            PanelName::Files => "files",
            PanelName::Schema => "schema",
            PanelName::Explore => "explore",
            PanelName::Settings => "settings",
        }
    }

    /// Template fragment backing this panel.
    pub fn template(&self) -> &'static str {
        match self {
            PanelName::Files => "dataset/detail/files.html",
            PanelName::Schema => "dataset/detail/schema.html",
            PanelName::Explore => "dataset/detail/explore.html",
            PanelName::Settings => "dataset/detail/settings.html",
        }
    }
}

impl std::fmt::Display for PanelName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Context for one dataset detail panel.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetPanel {
    pub dataset: DatasetEntry,
    pub files: Vec<DataFileEntry>,
    pub panel_name: PanelName,
}
