use crate::geo::AreaName;
use crate::geo::FortType;
use crate::geo::Location;
use serde::Deserialize;
use serde::Serialize;
use serde_with::skip_serializing_none;

pub const FORT_UPDATE: &str = "fort_update";

/// Reduced fort view compared by the change notifier.
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FortWebhook {
    pub id: String,
    #[serde(rename = "type")]
    pub fort_type: FortType,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub location: Location,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    New,
    Removal,
    Edit,
}

impl ChangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Removal => "removal",
            Self::Edit => "edit",
        }
    }
}

/// Ordered as they are reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditType {
    Name,
    Description,
    ImageUrl,
    Location,
}

#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FortChange {
    pub change_type: ChangeType,
    #[serde(default)]
    pub edit_types: Option<Vec<EditType>>,
    #[serde(default)]
    pub old: Option<FortWebhook>,
    #[serde(default)]
    pub new: Option<FortWebhook>,
}

/// Queued webhook; `areas` route it to destinations and never leave the process.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WebhookMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(skip)]
    pub areas: Vec<AreaName>,
    pub message: serde_json::Value,
}
